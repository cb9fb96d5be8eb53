//! Name-based exclusion of non-common-equity instruments.
//!
//! Case-sensitive substring match over the display name. This is an
//! approximate classifier: financial issuers whose names match no keyword
//! stay in the universe.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionCategory {
    Etf,
    Warrant,
    DepositaryReceipt,
    BeneficiarySecurity,
    Fund,
    Financial,
    /// Keywords supplied by configuration without a category.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    pub category: ExclusionCategory,
    pub keyword: String,
}

impl KeywordRule {
    pub fn new(category: ExclusionCategory, keyword: impl Into<String>) -> Self {
        Self {
            category,
            keyword: keyword.into(),
        }
    }
}

/// Ordered denylist; the first matching rule is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionPolicy {
    rules: Vec<KeywordRule>,
}

impl ExclusionPolicy {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        let rules = rules.into_iter().filter(|r| !r.keyword.is_empty()).collect();
        Self { rules }
    }

    /// Policy from a plain keyword list, categorised where the keyword is
    /// one of the reference rules.
    pub fn from_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let reference = Self::default();
        let rules = keywords
            .into_iter()
            .map(|k| {
                let keyword = k.as_ref().trim().to_string();
                let category = reference
                    .rules
                    .iter()
                    .find(|r| r.keyword == keyword)
                    .map(|r| r.category)
                    .unwrap_or(ExclusionCategory::Custom);
                KeywordRule { category, keyword }
            })
            .collect();
        Self::new(rules)
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn matching_rule(&self, name: &str) -> Option<&KeywordRule> {
        self.rules.iter().find(|r| name.contains(r.keyword.as_str()))
    }

    pub fn excludes(&self, name: &str) -> bool {
        self.matching_rule(name).is_some()
    }
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        use ExclusionCategory::*;
        let rules = [
            (Etf, "ETF"),
            (Warrant, "權證"),
            (DepositaryReceipt, "DR"),
            (BeneficiarySecurity, "受益證券"),
            (Fund, "基金"),
            (Financial, "富邦"),
            (Financial, "元大"),
            (Financial, "國泰"),
            (Financial, "群益"),
            (Financial, "永豐"),
            (Financial, "台新"),
            (Financial, "銀行"),
            (Financial, "金控"),
            (Financial, "金融"),
            (Financial, "證券"),
            (Financial, "保險"),
        ]
        .into_iter()
        .map(|(c, k)| KeywordRule::new(c, k))
        .collect();
        Self::new(rules)
    }
}
