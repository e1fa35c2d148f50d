use std::fmt::{Display, Formatter};

use crate::classifier::ClassificationResult;
use crate::error::{GateError, Result};

/// The keyword looked for in the top label, e.g. `hotdog` or `cat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target(String);

impl Target {
    pub fn new(keyword: impl Into<String>) -> Result<Self> {
        let keyword = keyword.into();
        // every label contains the empty string
        if keyword.is_empty() {
            return Err(GateError::Config("target keyword is empty".to_string()));
        }
        Ok(Self(keyword))
    }

    /// Case-sensitive literal substring match.
    pub fn matches(&self, label: &str) -> bool {
        label.contains(self.0.as_str())
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Yes/no answer for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub is_match: bool,
    /// The top label the answer was derived from.
    pub label: String,
    pub confidence: f32,
    pub target: Target,
}

impl Decision {
    /// `It's A hotdog!` / `It's Not A hotdog!`
    pub fn title(&self) -> String {
        if self.is_match {
            format!("It's A {}!", self.target)
        } else {
            format!("It's Not A {}!", self.target)
        }
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title())
    }
}

/// Decides from the top label alone.
///
/// Lower-ranked labels and every confidence are ignored, so a correct answer
/// at rank 2 is missed and a coincidental substring in the top label counts
/// as a match. There is no confidence threshold.
pub fn decide(result: &ClassificationResult, target: &Target) -> Result<Decision> {
    let top = result
        .top()
        .ok_or_else(|| GateError::inference("classifier returned no results"))?;

    Ok(Decision {
        is_match: target.matches(&top.label),
        label: top.label.clone(),
        confidence: top.confidence,
        target: target.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classification;

    fn result(entries: &[(&str, f32)]) -> ClassificationResult {
        ClassificationResult::new(
            entries
                .iter()
                .map(|(label, confidence)| Classification::new(*label, *confidence))
                .collect(),
        )
    }

    fn target(keyword: &str) -> Target {
        Target::new(keyword).unwrap()
    }

    #[test]
    fn hot_dog_bun_is_not_a_hotdog() {
        let decision = decide(&result(&[("hot dog bun", 0.9)]), &target("hotdog")).unwrap();
        assert!(!decision.is_match);
        assert_eq!(decision.title(), "It's Not A hotdog!");
    }

    #[test]
    fn hotdog_is_a_hotdog() {
        let decision = decide(&result(&[("hotdog", 0.8)]), &target("hotdog")).unwrap();
        assert!(decision.is_match);
        assert_eq!(decision.title(), "It's A hotdog!");
        assert_eq!(decision.label, "hotdog");
        assert_eq!(decision.confidence, 0.8);
    }

    #[test]
    fn tabby_cat_is_a_cat() {
        let decision = decide(&result(&[("tabby cat", 0.6)]), &target("cat")).unwrap();
        assert!(decision.is_match);
        assert_eq!(decision.to_string(), "It's A cat!");
    }

    #[test]
    fn golden_retriever_is_not_a_cat() {
        let decision = decide(&result(&[("golden retriever", 0.95)]), &target("cat")).unwrap();
        assert!(!decision.is_match);
        assert_eq!(decision.to_string(), "It's Not A cat!");
    }

    #[test]
    fn match_is_case_sensitive() {
        assert!(!decide(&result(&[("Hotdog", 1.0)]), &target("hotdog"))
            .unwrap()
            .is_match);
        assert!(!decide(&result(&[("hotdog", 1.0)]), &target("HOTDOG"))
            .unwrap()
            .is_match);
    }

    #[test]
    fn coincidental_substring_matches() {
        // "cat" inside "catamaran": the known cost of substring matching
        let decision = decide(&result(&[("catamaran", 0.7)]), &target("cat")).unwrap();
        assert!(decision.is_match);
    }

    #[test]
    fn only_the_top_entry_is_considered() {
        let target = target("cat");
        let top = ("golden retriever", 0.4);
        let tails: [&[(&str, f32)]; 4] = [
            &[],
            &[("tabby cat", 0.39)],
            &[("tiger cat", 0.3), ("Persian cat", 0.2), ("cat", 0.1)],
            &[("lynx", 0.01)],
        ];

        for tail in tails {
            let mut entries = vec![top];
            entries.extend_from_slice(tail);
            let decision = decide(&result(&entries), &target).unwrap();
            assert!(!decision.is_match, "tail {tail:?} changed the outcome");
            assert_eq!(decision.label, "golden retriever");
        }
    }

    #[test]
    fn confidence_does_not_affect_outcome() {
        for confidence in [0.0, 0.01, 0.5, 1.0] {
            let decision = decide(&result(&[("hotdog", confidence)]), &target("hotdog")).unwrap();
            assert!(decision.is_match);
        }
    }

    #[test]
    fn empty_result_is_an_inference_error() {
        let err = decide(&ClassificationResult::default(), &target("hotdog")).unwrap_err();
        assert!(matches!(err, GateError::Inference(_)));
    }

    #[test]
    fn empty_target_is_rejected() {
        let err = Target::new("").unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
    }
}
