//! 匹配模式
//!
//! 模式由若干条线性链组成，每条链是 `顶点 (边 顶点)*`。每一步带可选的变量槽位、
//! 可选的类型约束，以及编译期算好的 `first_occurrence` 标记：
//! 变量第一次出现的步骤负责绑定，之后出现的步骤只做一致性检查。

use crate::storage::{ElementRef, Graph, TableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    /// `->`
    Out,
    /// `<-`
    In,
    /// `-`，出边与入边都匹配
    Any,
}

/// 链中的一步（顶点或边）
#[derive(Debug, Clone, PartialEq)]
pub struct PatternStep {
    slot: Option<usize>,
    table: Option<TableId>,
    first_occurrence: bool,
}

impl PatternStep {
    pub fn new(slot: Option<usize>, table: Option<TableId>) -> Self {
        Self {
            slot,
            table,
            first_occurrence: false,
        }
    }

    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    pub fn table(&self) -> Option<TableId> {
        self.table
    }

    pub fn is_first_occurrence(&self) -> bool {
        self.first_occurrence
    }

    /// 尝试把候选元素应用到作用域上
    #[inline]
    pub fn apply(&self, graph: &Graph, candidate: ElementRef, scope: &mut [Option<ElementRef>]) -> bool {
        if let Some(table) = self.table {
            if graph.element_table(candidate) != table {
                return false;
            }
        }
        let Some(slot) = self.slot else {
            return true;
        };
        if self.first_occurrence {
            scope[slot] = Some(candidate);
            true
        } else {
            scope[slot] == Some(candidate)
        }
    }

    /// 只有负责绑定的步骤才清空槽位
    #[inline]
    pub fn unset(&self, scope: &mut [Option<ElementRef>]) {
        if let (Some(slot), true) = (self.slot, self.first_occurrence) {
            scope[slot] = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    pub edge: PatternStep,
    pub direction: EdgeDirection,
    pub vertex: PatternStep,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternChain {
    pub start: PatternStep,
    pub hops: Vec<Hop>,
}

impl PatternChain {
    pub fn new(start: PatternStep) -> Self {
        Self {
            start,
            hops: Vec::new(),
        }
    }

    pub fn push_hop(&mut self, edge: PatternStep, direction: EdgeDirection, vertex: PatternStep) {
        self.hops.push(Hop {
            edge,
            direction,
            vertex,
        });
    }
}

/// 编译后的匹配模式
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPattern {
    chains: Vec<PatternChain>,
    width: usize,
}

impl MatchPattern {
    /// 按遍历顺序计算每个变量的首次出现位置；`width` 为具名变量个数
    pub fn compile(mut chains: Vec<PatternChain>, width: usize) -> Self {
        let mut seen = vec![false; width];
        let mut mark = |step: &mut PatternStep| {
            if let Some(slot) = step.slot {
                step.first_occurrence = !seen[slot];
                seen[slot] = true;
            }
        };
        for chain in &mut chains {
            mark(&mut chain.start);
            for hop in &mut chain.hops {
                mark(&mut hop.edge);
                mark(&mut hop.vertex);
            }
        }
        Self { chains, width }
    }

    pub fn chains(&self) -> &[PatternChain] {
        &self.chains
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// 搜索层数：每条链的起点一层，每一跳一层
    pub fn level_count(&self) -> usize {
        self.chains.iter().map(|c| 1 + c.hops.len()).sum()
    }
}
