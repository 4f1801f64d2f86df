//! Pattern categories and the registry each detector scores against.
//!
//! A category is an immutable rule set (keywords or regexes) plus a weight
//! and a normalization policy. Updates build a new rule set and swap it in,
//! so a registry snapshot taken at the start of a detection never changes
//! underneath it.

use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use super::DetectorFamily;
use crate::error::{Result, SpamGuardError};

/// How a category turns a match count into a score in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// `min(matches / total, 1)`
    Linear,
    /// `min(ln(matches + 1) / ln(total + 1), 1)`, zero when nothing matched
    Logarithmic,
    /// `min(matches / divisor, 1)`, independent of the rule count
    Saturating(f64),
}

impl Normalization {
    /// Normalize `matches` out of `total` rules.
    pub fn score(&self, matches: usize, total: usize) -> f64 {
        if matches == 0 {
            return 0.0;
        }
        match *self {
            Normalization::Linear => {
                if total == 0 {
                    return 0.0;
                }
                (matches as f64 / total as f64).min(1.0)
            }
            Normalization::Logarithmic => {
                let denom = ((total + 1) as f64).ln();
                if denom <= 0.0 {
                    return 0.0;
                }
                (((matches + 1) as f64).ln() / denom).min(1.0)
            }
            Normalization::Saturating(divisor) => {
                if divisor <= 0.0 {
                    return 1.0;
                }
                (matches as f64 / divisor).min(1.0)
            }
        }
    }
}

/// Kind of rules a category holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Case-insensitive substring keywords
    Keywords,
    /// Case-insensitive regular expressions (search, not full match)
    Regexes,
}

/// A single detection rule.
#[derive(Debug, Clone)]
pub enum Rule {
    Keyword { source: String, folded: String },
    Regex(Regex),
}

impl Rule {
    fn keyword(source: &str) -> Self {
        Rule::Keyword {
            source: source.to_string(),
            folded: source.to_lowercase(),
        }
    }

    fn regex(source: &str) -> Result<Self> {
        let re = RegexBuilder::new(source).case_insensitive(true).build()?;
        Ok(Rule::Regex(re))
    }

    /// The pattern as it was supplied.
    pub fn source(&self) -> &str {
        match self {
            Rule::Keyword { source, .. } => source,
            Rule::Regex(re) => re.as_str(),
        }
    }

    /// Return the matched text, if any. Keywords report themselves.
    fn find(&self, text: &str, folded: &str) -> Option<String> {
        match self {
            Rule::Keyword { source, folded: kw } => folded.contains(kw.as_str()).then(|| source.clone()),
            Rule::Regex(re) => re.find(text).map(|m| m.as_str().to_string()),
        }
    }

    /// Count every non-overlapping occurrence.
    fn count(&self, text: &str, folded: &str) -> usize {
        match self {
            Rule::Keyword { folded: kw, .. } => {
                if kw.is_empty() {
                    0
                } else {
                    folded.matches(kw.as_str()).count()
                }
            }
            Rule::Regex(re) => re.find_iter(text).count(),
        }
    }
}

/// Immutable set of rules of one kind.
#[derive(Debug, Clone)]
pub struct RuleSet {
    kind: RuleKind,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a keyword rule set.
    pub fn keywords(keywords: &[&str]) -> Self {
        Self {
            kind: RuleKind::Keywords,
            rules: keywords.iter().map(|k| Rule::keyword(k)).collect(),
        }
    }

    /// Build a regex rule set. Fails if any expression does not compile.
    pub fn regexes(patterns: &[&str]) -> Result<Self> {
        let rules = patterns
            .iter()
            .map(|p| Rule::regex(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            kind: RuleKind::Regexes,
            rules,
        })
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Whether a rule with this source text exists.
    pub fn contains(&self, pattern: &str) -> bool {
        self.rules.iter().any(|r| r.source() == pattern)
    }

    /// A copy of this set with `pattern` appended.
    fn with_added(&self, pattern: &str) -> Result<Self> {
        let rule = match self.kind {
            RuleKind::Keywords => Rule::keyword(pattern),
            RuleKind::Regexes => Rule::regex(pattern)?,
        };
        let mut rules = self.rules.clone();
        rules.push(rule);
        Ok(Self {
            kind: self.kind,
            rules,
        })
    }

    /// A copy of this set without rules whose source equals `pattern`.
    fn without(&self, pattern: &str) -> Self {
        Self {
            kind: self.kind,
            rules: self
                .rules
                .iter()
                .filter(|r| r.source() != pattern)
                .cloned()
                .collect(),
        }
    }
}

/// Result of scoring one category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryMatch {
    /// Matched keywords / matched substrings, in rule order
    pub matches: Vec<String>,
    /// Normalized score in `[0, 1]`
    pub score: f64,
}

impl CategoryMatch {
    pub fn is_match(&self) -> bool {
        !self.matches.is_empty()
    }
}

/// A named, weighted category of rules.
#[derive(Debug, Clone)]
pub struct PatternCategory {
    name: String,
    weight: f64,
    normalization: Normalization,
    rules: Arc<RuleSet>,
}

impl PatternCategory {
    pub fn new(name: impl Into<String>, weight: f64, normalization: Normalization, rules: RuleSet) -> Self {
        Self {
            name: name.into(),
            weight,
            normalization,
            rules: Arc::new(rules),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Record the first match of every rule and normalize the count.
    ///
    /// `folded` must be `text.to_lowercase()`.
    pub fn evaluate(&self, text: &str, folded: &str) -> CategoryMatch {
        let matches: Vec<String> = self
            .rules
            .rules()
            .iter()
            .filter_map(|rule| rule.find(text, folded))
            .collect();
        let score = self.normalization.score(matches.len(), self.rules.len());
        CategoryMatch { matches, score }
    }

    /// Total non-overlapping occurrences across all rules.
    pub fn count_occurrences(&self, text: &str, folded: &str) -> usize {
        self.rules.rules().iter().map(|r| r.count(text, folded)).sum()
    }

    /// Whether any rule matches.
    pub fn matches_any(&self, text: &str, folded: &str) -> bool {
        self.rules.rules().iter().any(|r| r.find(text, folded).is_some())
    }
}

/// Ordered mapping from category name to category for one detector family.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    family: DetectorFamily,
    categories: Vec<PatternCategory>,
}

impl PatternRegistry {
    pub fn new(family: DetectorFamily) -> Self {
        Self {
            family,
            categories: Vec::new(),
        }
    }

    /// Add a keyword category.
    pub fn with_keywords(
        mut self,
        name: &str,
        weight: f64,
        normalization: Normalization,
        keywords: &[&str],
    ) -> Self {
        self.categories.push(PatternCategory::new(
            name,
            weight,
            normalization,
            RuleSet::keywords(keywords),
        ));
        self
    }

    /// Add a regex category.
    pub fn with_regexes(
        mut self,
        name: &str,
        weight: f64,
        normalization: Normalization,
        patterns: &[&str],
    ) -> Result<Self> {
        self.categories.push(PatternCategory::new(
            name,
            weight,
            normalization,
            RuleSet::regexes(patterns)?,
        ));
        Ok(self)
    }

    pub fn family(&self) -> DetectorFamily {
        self.family
    }

    pub fn categories(&self) -> &[PatternCategory] {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&PatternCategory> {
        self.categories.iter().find(|c| c.name == name)
    }

    fn category_mut(&mut self, name: &str) -> Result<&mut PatternCategory> {
        let family = self.family;
        self.categories
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| SpamGuardError::UnknownCategory {
                family,
                category: name.to_string(),
            })
    }

    /// Add a pattern to a category. Returns `false` if it was already present.
    /// Blank patterns are rejected.
    pub fn add_pattern(&mut self, category: &str, pattern: &str) -> Result<bool> {
        let cat = self.category_mut(category)?;
        if pattern.trim().is_empty() {
            return Err(SpamGuardError::EmptyPattern {
                category: category.to_string(),
            });
        }
        if cat.rules.contains(pattern) {
            return Ok(false);
        }
        cat.rules = Arc::new(cat.rules.with_added(pattern)?);
        Ok(true)
    }

    /// Remove a pattern from a category. Returns `false` if it was not present.
    pub fn remove_pattern(&mut self, category: &str, pattern: &str) -> Result<bool> {
        let cat = self.category_mut(category)?;
        if !cat.rules.contains(pattern) {
            return Ok(false);
        }
        cat.rules = Arc::new(cat.rules.without(pattern));
        Ok(true)
    }

    /// Replace a category weight, clamped to `[0, 1]`.
    pub fn set_weight(&mut self, category: &str, weight: f64) -> Result<()> {
        if !weight.is_finite() {
            return Err(SpamGuardError::InvalidWeight {
                category: category.to_string(),
                weight,
            });
        }
        self.category_mut(category)?.weight = weight.clamp(0.0, 1.0);
        Ok(())
    }

    /// Sum of all category weights.
    pub fn total_weight(&self) -> f64 {
        self.categories.iter().map(|c| c.weight).sum()
    }
}
