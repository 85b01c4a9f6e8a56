use tracing::debug;

use crate::constants::BRANCH_ALIASES;

/// Maps raw branch names onto canonical ones.
///
/// Aliases are an ordered list of `(fragment, canonical)` pairs. The first
/// fragment found (case-insensitively) anywhere in the input decides the
/// result; inputs matching no fragment are returned unchanged.
#[derive(Debug, Clone)]
pub struct BranchNormalizer {
    aliases: Vec<(String, String)>,
}

impl Default for BranchNormalizer {
    fn default() -> Self {
        Self::new(BRANCH_ALIASES.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }
}

impl BranchNormalizer {
    pub fn new<I>(aliases: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            aliases: aliases
                .into_iter()
                .map(|(fragment, canonical)| (fragment.to_lowercase(), canonical))
                .collect(),
        }
    }

    pub fn canonical(&self, raw: &str) -> String {
        let lowered = raw.to_lowercase();
        match self
            .aliases
            .iter()
            .find(|(fragment, _)| lowered.contains(fragment.as_str()))
        {
            Some((_, canonical)) => {
                debug!("Branch {:?} -> {:?}", raw, canonical);
                canonical.clone()
            }
            None => raw.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_variants_map_to_canonical() {
        let n = BranchNormalizer::default();
        assert_eq!(n.canonical("нохияи Спитамен"), "Спитамен");
        assert_eq!(n.canonical("нохиаи Спитамен"), "Спитамен");
        assert_eq!(n.canonical("нохияи Ч. Расулов"), "Ч. Расулов");
        assert_eq!(n.canonical("шаҳри Панчакент"), "Панчакент");
    }

    #[test]
    fn test_substring_and_case_insensitive() {
        let n = BranchNormalizer::default();
        assert_eq!(n.canonical("ООО Филиал НОХИЯИ СПИТАМЕН (офис 2)"), "Спитамен");
    }

    #[test]
    fn test_unknown_branch_unchanged() {
        let n = BranchNormalizer::default();
        assert_eq!(n.canonical("Central"), "Central");
        assert_eq!(n.canonical(""), "");
    }

    #[test]
    fn test_first_matching_alias_wins() {
        let n = BranchNormalizer::new(vec![
            ("north".to_string(), "North".to_string()),
            ("north east".to_string(), "North-East".to_string()),
        ]);
        assert_eq!(n.canonical("Branch North East"), "North");
    }
}
