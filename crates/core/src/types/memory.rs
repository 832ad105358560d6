use serde::{Deserialize, Serialize};

/// Findings accumulated over one run.
///
/// Once `exact_answer` holds an entry, the memory is considered solved and
/// serialization short-circuits to the latest answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub state_memory: Vec<String>,
    pub evidence_memory: Vec<String>,
    pub exact_answer: Vec<String>,
    pub instruction_set: Vec<String>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest solved answer, if any.
    pub fn solved_answer(&self) -> Option<&str> {
        self.exact_answer.last().map(String::as_str)
    }

    pub fn is_solved(&self) -> bool {
        !self.exact_answer.is_empty()
    }

    pub fn latest_state(&self) -> Option<&str> {
        self.state_memory.last().map(String::as_str)
    }

    pub fn latest_evidence(&self) -> Option<&str> {
        self.evidence_memory.last().map(String::as_str)
    }

    /// Textual form handed to the generator and reflector.
    pub fn serialize(&self) -> String {
        if let Some(answer) = self.solved_answer() {
            return format!("[Solved Answer]{}", answer);
        }
        format!(
            "[State Memory]:{}\n[Evidence Memory]:{}\n",
            json_list(&self.state_memory),
            json_list(&self.evidence_memory)
        )
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.state_memory.clear();
        self.evidence_memory.clear();
        self.exact_answer.clear();
        self.instruction_set.clear();
    }
}

fn json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_unsolved() {
        let memory = Memory {
            state_memory: vec!["X is 4".into()],
            evidence_memory: vec!["doc says 4".into()],
            ..Default::default()
        };
        assert_eq!(
            memory.serialize(),
            "[State Memory]:[\"X is 4\"]\n[Evidence Memory]:[\"doc says 4\"]\n"
        );
    }

    #[test]
    fn test_serialize_short_circuits() {
        let mut memory = Memory::new();
        memory.state_memory.push("noise".into());
        memory.exact_answer.push("40".into());
        memory.exact_answer.push("41".into());

        assert!(memory.is_solved());
        assert_eq!(memory.serialize(), "[Solved Answer]41");
    }

    #[test]
    fn test_empty_memory() {
        let memory = Memory::new();
        assert_eq!(memory.serialize(), "[State Memory]:[]\n[Evidence Memory]:[]\n");
        assert!(memory.solved_answer().is_none());
    }
}
