use serde::Serialize;

/// A rendered finding. `insight` is `None` when there is nothing notable to say.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub emoji: &'static str,
    pub title: &'static str,
    pub insight: Option<String>,
}
