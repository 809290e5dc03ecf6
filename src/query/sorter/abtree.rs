//! 多路平衡搜索树（B 树）排序
//!
//! 行下标逐个插入，按比较器有序；插入位置取上界，相等的键排在已有键之后，
//! 因此中序遍历对相等键保持到达顺序。节点存放在数组里，以下标互相引用。

use std::cmp::Ordering;

use crate::core::error::DBResult;
use crate::expression::RowSource;
use crate::query::comparer::KeyTemplate;

/// 最小度数，每个节点最多 `2 * MIN_DEGREE - 1` 个键
const MIN_DEGREE: usize = 16;
const MAX_KEYS: usize = 2 * MIN_DEGREE - 1;

#[derive(Debug, Clone, Default)]
struct Node {
    keys: Vec<usize>,
    children: Vec<usize>,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AbTree {
    nodes: Vec<Node>,
    root: usize,
    len: usize,
}

impl Default for AbTree {
    fn default() -> Self {
        Self::new()
    }
}

impl AbTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            root: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 第一个严格大于 `row` 的键的位置
    fn upper_bound<F>(keys: &[usize], row: usize, compare: &F) -> usize
    where
        F: Fn(usize, usize) -> Ordering,
    {
        keys.partition_point(|&key| compare(row, key) != Ordering::Less)
    }

    pub fn insert<F>(&mut self, row: usize, compare: F)
    where
        F: Fn(usize, usize) -> Ordering,
    {
        if self.nodes[self.root].keys.len() == MAX_KEYS {
            let old_root = self.root;
            self.nodes.push(Node {
                keys: Vec::with_capacity(MAX_KEYS),
                children: vec![old_root],
            });
            self.root = self.nodes.len() - 1;
            self.split_child(self.root, 0);
        }

        let mut node = self.root;
        loop {
            let position = Self::upper_bound(&self.nodes[node].keys, row, &compare);
            if self.nodes[node].is_leaf() {
                self.nodes[node].keys.insert(position, row);
                break;
            }
            let mut child_index = position;
            let child = self.nodes[node].children[child_index];
            if self.nodes[child].keys.len() == MAX_KEYS {
                self.split_child(node, child_index);
                let median = self.nodes[node].keys[child_index];
                if compare(row, median) != Ordering::Less {
                    child_index += 1;
                }
            }
            node = self.nodes[node].children[child_index];
        }
        self.len += 1;
    }

    /// 把满的子节点一分为二，中位键上移到父节点
    fn split_child(&mut self, parent: usize, index: usize) {
        let child = self.nodes[parent].children[index];
        let right_keys = self.nodes[child].keys.split_off(MIN_DEGREE);
        let median = self.nodes[child].keys.pop();
        let right_children = if self.nodes[child].is_leaf() {
            Vec::new()
        } else {
            self.nodes[child].children.split_off(MIN_DEGREE)
        };
        self.nodes.push(Node {
            keys: right_keys,
            children: right_children,
        });
        let right = self.nodes.len() - 1;
        if let Some(median) = median {
            self.nodes[parent].keys.insert(index, median);
        }
        self.nodes[parent].children.insert(index + 1, right);
    }

    /// 中序遍历
    pub fn iter(&self) -> Iter<'_> {
        let mut iter = Iter {
            tree: self,
            stack: Vec::new(),
        };
        if self.len > 0 {
            iter.push_left(self.root);
        }
        iter
    }
}

/// 显式栈实现的中序迭代器
pub struct Iter<'a> {
    tree: &'a AbTree,
    stack: Vec<(usize, usize)>,
}

impl Iter<'_> {
    fn push_left(&mut self, mut node: usize) {
        loop {
            self.stack.push((node, 0));
            let current = &self.tree.nodes[node];
            if current.is_leaf() {
                break;
            }
            node = current.children[0];
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let tree = self.tree;
        loop {
            let (node, position) = self.stack.last_mut()?;
            let current = &tree.nodes[*node];
            if *position < current.keys.len() {
                let key = current.keys[*position];
                *position += 1;
                if let Some(&child) = current.children.get(*position) {
                    self.push_left(child);
                }
                return Some(key);
            }
            self.stack.pop();
        }
    }
}

#[derive(Debug, Clone)]
pub struct AbTreeSorter {
    template: KeyTemplate,
}

impl AbTreeSorter {
    pub fn new(template: KeyTemplate) -> Self {
        Self { template }
    }

    pub fn sort<S>(&self, source: &S) -> DBResult<Vec<usize>>
    where
        S: RowSource + ?Sized,
    {
        let comparer = self.template.row_comparer(true);
        let mut tree = AbTree::new();
        for row in 0..source.row_count() {
            tree.insert(row, |x, y| comparer.compare(source, x, y));
        }
        Ok(tree.iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn sorted_by_tree(keys: &[i32]) -> Vec<usize> {
        let mut tree = AbTree::new();
        for row in 0..keys.len() {
            tree.insert(row, |a, b| keys[a].cmp(&keys[b]));
        }
        assert_eq!(tree.len(), keys.len());
        tree.iter().collect()
    }

    #[test]
    fn test_matches_stable_sort() {
        let mut rng = rand::thread_rng();
        for size in [0, 1, 31, 32, 33, 500, 5000] {
            let keys: Vec<i32> = (0..size).map(|_| rng.gen_range(0..20)).collect();
            let mut expected: Vec<usize> = (0..keys.len()).collect();
            expected.sort_by_key(|&i| keys[i]);
            assert_eq!(sorted_by_tree(&keys), expected, "size = {}", size);
        }
    }

    #[test]
    fn test_all_equal_keeps_arrival_order() {
        let keys = vec![7; 1000];
        assert_eq!(sorted_by_tree(&keys), (0..1000).collect::<Vec<_>>());
    }
}
