//! 迭代式深度优先匹配
//!
//! 每条链的起点和每一跳各占一层，每层维护自己的游标；一次前进一跳，
//! 走到死路时按严格相反的顺序撤销绑定，再尝试本层的下一个候选。
//! 匹配器不共享任何遍历状态，并行时每个工作线程持有自己的实例。

use std::ops::Range;
use std::sync::Arc;

use crate::query::matcher::pattern::{EdgeDirection, Hop, MatchPattern};
use crate::storage::{ElementRef, Graph};

#[derive(Debug, Clone, Copy)]
enum Level {
    Start { chain: usize },
    Hop { chain: usize, hop: usize },
}

#[derive(Debug, Clone, Copy)]
enum Cursor {
    /// 顺序扫描顶点区间
    Scan { next: u32, end: u32 },
    /// 起点变量已绑定，只有一个候选
    Bound { vertex: Option<u32> },
    /// 出边区间，之后可能继续入边
    OutEdges { next: usize, end: usize, then_in: bool },
    /// 入边下标数组内的偏移
    InEdges { next: usize, end: usize },
}

enum NextEdge {
    Edge(u32, u32),
    SwitchToIn,
    Skip,
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct DfsMatcher {
    graph: Arc<Graph>,
    pattern: Arc<MatchPattern>,
    levels: Vec<Level>,
    cursors: Vec<Cursor>,
    /// 每层绑定到的顶点
    current: Vec<u32>,
    scope: Vec<Option<ElementRef>>,
    row: Vec<ElementRef>,
}

impl DfsMatcher {
    pub fn new(graph: Arc<Graph>, pattern: Arc<MatchPattern>) -> Self {
        let mut levels = Vec::with_capacity(pattern.level_count());
        for (chain_index, chain) in pattern.chains().iter().enumerate() {
            levels.push(Level::Start { chain: chain_index });
            for hop in 0..chain.hops.len() {
                levels.push(Level::Hop {
                    chain: chain_index,
                    hop,
                });
            }
        }
        let depth = levels.len();
        let width = pattern.width();
        Self {
            graph,
            pattern,
            levels,
            cursors: vec![Cursor::Bound { vertex: None }; depth],
            current: vec![0; depth],
            scope: vec![None; width],
            row: Vec::with_capacity(width),
        }
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    pub fn pattern(&self) -> &Arc<MatchPattern> {
        &self.pattern
    }

    /// 以 `start_range` 内的顶点作为第一条链的起点搜索，每个匹配调用一次 `emit`
    pub fn search<F>(&mut self, start_range: Range<u32>, mut emit: F) -> usize
    where
        F: FnMut(&[ElementRef]),
    {
        let depth = self.levels.len();
        if depth == 0 || start_range.is_empty() {
            return 0;
        }
        let mut matches = 0;
        self.cursors[0] = Cursor::Scan {
            next: start_range.start,
            end: start_range.end,
        };
        let mut level = 0;
        loop {
            if self.advance(level) {
                if level + 1 == depth {
                    self.emit_row(&mut emit);
                    matches += 1;
                    self.undo(level);
                } else {
                    level += 1;
                    self.init_cursor(level);
                }
            } else if level == 0 {
                break;
            } else {
                level -= 1;
                self.undo(level);
            }
        }
        matches
    }

    fn emit_row<F: FnMut(&[ElementRef])>(&mut self, emit: &mut F) {
        self.row.clear();
        // 所有具名变量在完整匹配时都已绑定
        self.row.extend(self.scope.iter().flatten().copied());
        debug_assert_eq!(self.row.len(), self.scope.len());
        emit(&self.row);
    }

    fn init_cursor(&mut self, level: usize) {
        self.cursors[level] = match self.levels[level] {
            Level::Start { chain } => {
                let start = &self.pattern.chains()[chain].start;
                match start.slot() {
                    Some(slot) if !start.is_first_occurrence() => Cursor::Bound {
                        vertex: match self.scope[slot] {
                            Some(ElementRef::Vertex(v)) => Some(v),
                            _ => None,
                        },
                    },
                    _ => Cursor::Scan {
                        next: 0,
                        end: self.graph.vertex_count() as u32,
                    },
                }
            }
            Level::Hop { chain, hop } => {
                let from = self.graph.vertex(self.current[level - 1]);
                match self.pattern.chains()[chain].hops[hop].direction {
                    EdgeDirection::Out | EdgeDirection::Any => {
                        let range = from.out_edge_range();
                        Cursor::OutEdges {
                            next: range.start,
                            end: range.end,
                            then_in: self.pattern.chains()[chain].hops[hop].direction
                                == EdgeDirection::Any,
                        }
                    }
                    EdgeDirection::In => Cursor::InEdges {
                        next: 0,
                        end: from.in_edge_range().len(),
                    },
                }
            }
        };
    }

    /// 在本层找到下一个可应用的候选并绑定；候选耗尽返回 `false`
    fn advance(&mut self, level: usize) -> bool {
        let graph = &*self.graph;
        let pattern = &*self.pattern;
        match self.levels[level] {
            Level::Start { chain } => {
                let step = &pattern.chains()[chain].start;
                loop {
                    let candidate = match &mut self.cursors[level] {
                        Cursor::Scan { next, end } if *next < *end => {
                            *next += 1;
                            *next - 1
                        }
                        Cursor::Bound { vertex } => match vertex.take() {
                            Some(v) => v,
                            None => return false,
                        },
                        _ => return false,
                    };
                    if step.apply(graph, ElementRef::Vertex(candidate), &mut self.scope) {
                        self.current[level] = candidate;
                        return true;
                    }
                }
            }
            Level::Hop { chain, hop } => {
                let hop = &pattern.chains()[chain].hops[hop];
                let from = self.current[level - 1];
                loop {
                    let next = match &mut self.cursors[level] {
                        Cursor::OutEdges { next, end, .. } if *next < *end => {
                            *next += 1;
                            let e = (*next - 1) as u32;
                            NextEdge::Edge(e, graph.edge(e).target())
                        }
                        Cursor::OutEdges { then_in: true, .. } => NextEdge::SwitchToIn,
                        Cursor::InEdges { next, end } if *next < *end => {
                            *next += 1;
                            let e = graph.in_edges(from)[*next - 1];
                            let source = graph.edge(e).source();
                            // 任意方向时自环已在出边阶段匹配过
                            if hop.direction == EdgeDirection::Any && source == from {
                                NextEdge::Skip
                            } else {
                                NextEdge::Edge(e, source)
                            }
                        }
                        _ => NextEdge::Exhausted,
                    };
                    match next {
                        NextEdge::Edge(edge, neighbor) => {
                            if try_hop(graph, hop, &mut self.scope, edge, neighbor) {
                                self.current[level] = neighbor;
                                return true;
                            }
                        }
                        NextEdge::SwitchToIn => {
                            self.cursors[level] = Cursor::InEdges {
                                next: 0,
                                end: graph.in_edges(from).len(),
                            };
                        }
                        NextEdge::Skip => {}
                        NextEdge::Exhausted => return false,
                    }
                }
            }
        }
    }

    /// 撤销本层绑定：先顶点后边
    fn undo(&mut self, level: usize) {
        match self.levels[level] {
            Level::Start { chain } => {
                self.pattern.chains()[chain].start.unset(&mut self.scope);
            }
            Level::Hop { chain, hop } => {
                let hop = &self.pattern.chains()[chain].hops[hop];
                hop.vertex.unset(&mut self.scope);
                hop.edge.unset(&mut self.scope);
            }
        }
    }
}

fn try_hop(
    graph: &Graph,
    hop: &Hop,
    scope: &mut [Option<ElementRef>],
    edge: u32,
    neighbor: u32,
) -> bool {
    if !hop.edge.apply(graph, ElementRef::Edge(edge), scope) {
        return false;
    }
    if hop.vertex.apply(graph, ElementRef::Vertex(neighbor), scope) {
        return true;
    }
    hop.edge.unset(scope);
    false
}
