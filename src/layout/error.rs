/// Inputs the layout engine refuses to lay out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// Following parent edges from a block leads back to itself, so no depth
    /// can be assigned. `chain` lists the block ids around the loop, starting
    /// and ending with the same id.
    #[error("cyclic block hierarchy: {}", chain.join(" -> "))]
    CyclicHierarchy { chain: Vec<String> },
}
