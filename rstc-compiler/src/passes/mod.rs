//! The compiler pass pipeline.
//!
//! A pass is either a [`CompilerPass`] over the whole document list or a
//! [`NodeTransformer`] driven through a depth-first enter/leave walk of
//! each document's shadow tree. Transformers sharing a priority are grouped
//! into a synthetic [`TransformerPass`]. Passes execute in strictly
//! descending priority order; ties keep registration order.

mod collect;
mod finalize;
mod resolve;

pub use collect::{
    AnchorReattachmentTransformer, DocumentRegistrationPass, LinkTargetCollectorTransformer,
    ToctreeCollectorTransformer,
};
pub use finalize::{GlobalNavigationPass, OrphanDetectionPass, ToctreeValidationPass};
pub use resolve::{MenuEntryResolutionTransformer, ReferenceResolverTransformer};

use crate::config::CompilerConfig;
use crate::context::CompilationContext;
use rstc_parser::{BlockNode, DocumentNode};

/// Priority bands of the parallel compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Writes new facts into the project node (priority >= 4900)
    Collection,
    /// Reads the complete project node (priority 1000..4900)
    Resolution,
    /// Sequential-only global mutations (priority < 1000)
    Finalization,
}

impl Phase {
    pub fn contains(self, priority: i32) -> bool {
        match self {
            Phase::Collection => priority >= 4900,
            Phase::Resolution => (1000..4900).contains(&priority),
            Phase::Finalization => priority < 1000,
        }
    }

    /// Execution order of the phases
    pub fn ordered() -> [Phase; 3] {
        [Phase::Collection, Phase::Resolution, Phase::Finalization]
    }
}

/// A whole-document-list transformation
pub trait CompilerPass {
    fn priority(&self) -> i32;
    fn run(
        &mut self,
        documents: Vec<DocumentNode>,
        ctx: &mut CompilationContext,
    ) -> Vec<DocumentNode>;
}

/// A per-node transformation dispatched during a tree walk.
///
/// `leave_node` returning `None` removes the node from its parent;
/// returning a different node replaces it.
pub trait NodeTransformer {
    fn priority(&self) -> i32;
    fn supports(&self, node: &BlockNode) -> bool;

    /// Called once before walking each document
    fn enter_document(&mut self, _doc: &DocumentNode, _ctx: &mut CompilationContext) {}

    fn enter_node(&mut self, _node: &BlockNode, _ctx: &mut CompilationContext) {}

    fn leave_node(&mut self, node: BlockNode, _ctx: &mut CompilationContext) -> Option<BlockNode> {
        Some(node)
    }
}

/// Synthetic pass wrapping all transformers of one priority
pub struct TransformerPass {
    priority: i32,
    transformers: Vec<Box<dyn NodeTransformer>>,
}

impl TransformerPass {
    pub fn new(priority: i32, transformers: Vec<Box<dyn NodeTransformer>>) -> Self {
        Self {
            priority,
            transformers,
        }
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn run(
        &mut self,
        documents: Vec<DocumentNode>,
        ctx: &mut CompilationContext,
    ) -> Vec<DocumentNode> {
        let documents = documents
            .into_iter()
            .map(|mut doc| {
                ctx.current_document = Some(doc.path.clone());
                for transformer in &mut self.transformers {
                    transformer.enter_document(&doc, ctx);
                }
                let children = std::mem::take(&mut doc.children);
                doc.children = walk_children(&mut self.transformers, children, ctx);
                doc
            })
            .collect();
        ctx.current_document = None;
        documents
    }
}

fn walk_children(
    transformers: &mut [Box<dyn NodeTransformer>],
    children: Vec<BlockNode>,
    ctx: &mut CompilationContext,
) -> Vec<BlockNode> {
    children
        .into_iter()
        .filter_map(|child| walk(transformers, child, ctx))
        .collect()
}

/// Depth-first enter/leave walk over one node
fn walk(
    transformers: &mut [Box<dyn NodeTransformer>],
    mut node: BlockNode,
    ctx: &mut CompilationContext,
) -> Option<BlockNode> {
    for transformer in transformers.iter_mut() {
        if transformer.supports(&node) {
            transformer.enter_node(&node, ctx);
        }
    }

    let children = node.take_children();
    if !children.is_empty() {
        node.put_children(walk_children(transformers, children, ctx));
    }

    let mut current = node;
    for transformer in transformers.iter_mut() {
        if transformer.supports(&current) {
            match transformer.leave_node(current, ctx) {
                Some(next) => current = next,
                // tombstone: the node is removed from its parent
                None => return None,
            }
        }
    }
    Some(current)
}

enum Stage {
    Pass(Box<dyn CompilerPass>),
    Transformers(TransformerPass),
}

impl Stage {
    fn priority(&self) -> i32 {
        match self {
            Stage::Pass(pass) => pass.priority(),
            Stage::Transformers(pass) => pass.priority(),
        }
    }

    fn run(
        &mut self,
        documents: Vec<DocumentNode>,
        ctx: &mut CompilationContext,
    ) -> Vec<DocumentNode> {
        match self {
            Stage::Pass(pass) => pass.run(documents, ctx),
            Stage::Transformers(pass) => pass.run(documents, ctx),
        }
    }
}

/// The ordered pass pipeline for one compilation run.
///
/// Workers build their own instance from the same configuration, so pass
/// state never crosses a process or thread boundary.
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(
        passes: Vec<Box<dyn CompilerPass>>,
        transformers: Vec<Box<dyn NodeTransformer>>,
    ) -> Self {
        let mut stages: Vec<Stage> = passes.into_iter().map(Stage::Pass).collect();

        // group transformers by priority, keeping registration order
        let mut groups: Vec<(i32, Vec<Box<dyn NodeTransformer>>)> = Vec::new();
        for transformer in transformers {
            let priority = transformer.priority();
            match groups.iter_mut().find(|(p, _)| *p == priority) {
                Some((_, group)) => group.push(transformer),
                None => groups.push((priority, vec![transformer])),
            }
        }
        for (priority, group) in groups {
            stages.push(Stage::Transformers(TransformerPass::new(priority, group)));
        }

        // stable: ties keep the order built above
        stages.sort_by_key(|stage| std::cmp::Reverse(stage.priority()));
        Self { stages }
    }

    /// The standard pass set shipped with the compiler
    pub fn standard(config: &CompilerConfig) -> Self {
        let passes: Vec<Box<dyn CompilerPass>> = vec![
            Box::new(DocumentRegistrationPass::new(config.root_document.clone())),
            Box::new(GlobalNavigationPass::new()),
            Box::new(OrphanDetectionPass::new()),
            Box::new(ToctreeValidationPass::new()),
        ];
        let transformers: Vec<Box<dyn NodeTransformer>> = vec![
            Box::new(AnchorReattachmentTransformer::new()),
            Box::new(LinkTargetCollectorTransformer::new()),
            Box::new(ToctreeCollectorTransformer::new()),
            Box::new(ReferenceResolverTransformer::new()),
            Box::new(MenuEntryResolutionTransformer::new()),
        ];
        Self::new(passes, transformers)
    }

    /// Run every stage whose priority falls inside `phase`, in strictly
    /// descending priority order
    pub fn run_phase(
        &mut self,
        phase: Phase,
        mut documents: Vec<DocumentNode>,
        ctx: &mut CompilationContext,
    ) -> Vec<DocumentNode> {
        for stage in &mut self.stages {
            if phase.contains(stage.priority()) {
                documents = stage.run(documents, ctx);
            }
        }
        documents
    }

    /// Run all phases sequentially: the baseline correctness oracle
    pub fn run_all(
        &mut self,
        mut documents: Vec<DocumentNode>,
        ctx: &mut CompilationContext,
    ) -> Vec<DocumentNode> {
        for phase in Phase::ordered() {
            documents = self.run_phase(phase, documents, ctx);
        }
        documents
    }
}
