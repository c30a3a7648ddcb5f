/// One retrieval result: position of the chunk in the evidence store and its cosine score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub index: usize,
    pub score: f32,
}
