/// Query side of a projection, read by handlers and never written by them.
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Entries currently held, e.g. orders on the board.
    fn count(&self) -> usize;
}
