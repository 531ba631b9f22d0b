use crate::ast::{AnchorKind, Ast, CharClass, RegexNode};

#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
    Char(char),
    Any,
    Class(CharClass),
    Assert(AnchorKind),
    /// Record the current position in a capture slot.
    Save(usize),
    /// Continue at the first target; retry at the second on failure.
    Split(usize, usize),
    Jump(usize),
    /// Remember where a loop iteration started.
    Mark(usize),
    /// Leave the loop at `exit` when the iteration opened by `Mark`
    /// consumed nothing; the captures it made are kept.
    Progress { mark: usize, exit: usize },
    Match,
}

/// Instruction list for the backtracking matcher. Slots `2i` and `2i + 1`
/// hold the start and end of group `i`; group 0 is the whole match.
#[derive(Debug, Clone)]
pub struct Program {
    pub insts: Vec<Inst>,
    pub slot_count: usize,
    pub mark_count: usize,
    pub case_insensitive: bool,
}

/// Largest program the compiler will emit. Counted repeats are unrolled,
/// so nested counts multiply and are checked against this while parsing.
pub const MAX_PROGRAM_SIZE: usize = 100_000;

/// Number of instructions `compile` emits for the whole pattern.
pub fn program_size(alternatives: &[Vec<RegexNode>]) -> usize {
    alternatives_size(alternatives).saturating_add(3)
}

/// Number of instructions `Compiler::node` emits for `node`.
pub fn node_size(node: &RegexNode) -> usize {
    match node {
        RegexNode::Literal(_) | RegexNode::Any | RegexNode::Class(_) | RegexNode::Anchor(_) => 1,
        RegexNode::Group { alternatives, .. } => alternatives_size(alternatives).saturating_add(2),
        RegexNode::Repeat { node, min, max } => {
            let body = node_size(node);
            let mandatory = body.saturating_mul(*min);
            let optional = match max {
                Some(max) => body.saturating_add(1).saturating_mul(max - min),
                None => body.saturating_add(4),
            };
            mandatory.saturating_add(optional)
        }
    }
}

fn alternatives_size(alternatives: &[Vec<RegexNode>]) -> usize {
    let branches = alternatives
        .iter()
        .flatten()
        .fold(0usize, |total, node| total.saturating_add(node_size(node)));
    let glue = alternatives.len().saturating_sub(1).saturating_mul(2);
    branches.saturating_add(glue)
}

struct Compiler {
    insts: Vec<Inst>,
    mark_count: usize,
}

pub fn compile(ast: &Ast, case_insensitive: bool) -> Program {
    let mut compiler = Compiler {
        insts: Vec::new(),
        mark_count: 0,
    };
    compiler.emit(Inst::Save(0));
    compiler.alternatives(&ast.alternatives);
    compiler.emit(Inst::Save(1));
    compiler.emit(Inst::Match);

    Program {
        insts: compiler.insts,
        slot_count: (ast.group_count + 1) * 2,
        mark_count: compiler.mark_count,
        case_insensitive,
    }
}

impl Compiler {
    fn emit(&mut self, inst: Inst) -> usize {
        self.insts.push(inst);
        self.insts.len() - 1
    }

    fn next_pc(&self) -> usize {
        self.insts.len()
    }

    // a|b|c compiles to:
    //
    //     split L1, N1
    // L1: a
    //     jump END
    // N1: split L2, N2
    // L2: b
    //     jump END
    // N2: c
    // END:
    fn alternatives(&mut self, alternatives: &[Vec<RegexNode>]) {
        let mut jumps = Vec::new();
        let last = alternatives.len().saturating_sub(1);
        for (i, seq) in alternatives.iter().enumerate() {
            if i == last {
                self.sequence(seq);
                break;
            }
            let split = self.emit(Inst::Split(0, 0));
            self.sequence(seq);
            jumps.push(self.emit(Inst::Jump(0)));
            self.insts[split] = Inst::Split(split + 1, self.next_pc());
        }
        let end = self.next_pc();
        for jump in jumps {
            self.insts[jump] = Inst::Jump(end);
        }
    }

    fn sequence(&mut self, nodes: &[RegexNode]) {
        for node in nodes {
            self.node(node);
        }
    }

    fn node(&mut self, node: &RegexNode) {
        match node {
            RegexNode::Literal(c) => {
                self.emit(Inst::Char(*c));
            }
            RegexNode::Any => {
                self.emit(Inst::Any);
            }
            RegexNode::Class(class) => {
                self.emit(Inst::Class(class.clone()));
            }
            RegexNode::Anchor(kind) => {
                self.emit(Inst::Assert(*kind));
            }
            RegexNode::Group {
                index,
                alternatives,
            } => {
                self.emit(Inst::Save(index * 2));
                self.alternatives(alternatives);
                self.emit(Inst::Save(index * 2 + 1));
            }
            RegexNode::Repeat { node, min, max } => self.repeat(node, *min, *max),
        }
    }

    // The mandatory copies come first, then either a chain of optional
    // copies that all exit to the same place (bounded) or a loop that
    // stops after an empty iteration (unbounded). Every split prefers the body,
    // which makes repetition greedy.
    fn repeat(&mut self, node: &RegexNode, min: usize, max: Option<usize>) {
        for _ in 0..min {
            self.node(node);
        }

        match max {
            Some(max) => {
                let mut splits = Vec::new();
                for _ in min..max {
                    splits.push(self.emit(Inst::Split(0, 0)));
                    self.node(node);
                }
                let end = self.next_pc();
                for split in splits {
                    self.insts[split] = Inst::Split(split + 1, end);
                }
            }
            None => {
                let mark = self.mark_count;
                self.mark_count += 1;

                let head = self.emit(Inst::Split(0, 0));
                self.emit(Inst::Mark(mark));
                self.node(node);
                let progress = self.emit(Inst::Progress { mark, exit: 0 });
                self.emit(Inst::Jump(head));
                let exit = self.next_pc();
                self.insts[head] = Inst::Split(head + 1, exit);
                self.insts[progress] = Inst::Progress { mark, exit };
            }
        }
    }
}
