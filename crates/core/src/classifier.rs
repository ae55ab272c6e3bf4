//! Rule-based transformation of free-form user intent into a structured prompt.
//!
//! Used by "create" mode. The rules form an ordered decision table evaluated
//! first-match-wins; the last rule has no keywords and always matches.
//! Keywords match whole words (an optional plural `s` is allowed), so "law"
//! does not fire on "flaw".

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Domain category assigned to a user intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptCategory {
    Academic,
    Marketing,
    Sales,
    Support,
    Code,
    Healthcare,
    Legal,
    Finance,
    HumanResources,
    RealEstate,
    Content,
    Social,
    Email,
    Generic,
}

impl PromptCategory {
    /// Industry tag stored on the prompt when the caller does not supply one.
    pub fn industry_tag(self) -> &'static str {
        match self {
            Self::Academic => "education",
            Self::Marketing => "marketing",
            Self::Sales => "sales",
            Self::Support => "customer-support",
            Self::Code => "software",
            Self::Healthcare => "healthcare",
            Self::Legal => "legal",
            Self::Finance => "finance",
            Self::HumanResources => "human-resources",
            Self::RealEstate => "real-estate",
            Self::Content => "content",
            Self::Social => "social-media",
            Self::Email => "communication",
            Self::Generic => "general",
        }
    }
}

/// One row of the decision table.
pub struct IntentRule {
    pub category: PromptCategory,
    /// Lowercase words or phrases; any match selects the rule. Empty matches
    /// everything.
    pub keywords: &'static [&'static str],
    /// Markdown template. `{task}` is replaced with the user's intent; bracketed
    /// `[PLACEHOLDERS]` are left for the user to fill in.
    pub template: &'static str,
}

/// Case-insensitive whole-word pattern for a keyword list.
fn keyword_pattern(keywords: &[&str]) -> Regex {
    let alternatives: Vec<String> = keywords.iter().map(|k| regex::escape(k)).collect();
    Regex::new(&format!(r"(?i)\b(?:{})s?\b", alternatives.join("|"))).expect("valid regex")
}

/// One compiled pattern per rule, `None` for the catch-all.
static RULE_PATTERNS: LazyLock<Vec<Option<Regex>>> = LazyLock::new(|| {
    INTENT_RULES
        .iter()
        .map(|rule| (!rule.keywords.is_empty()).then(|| keyword_pattern(rule.keywords)))
        .collect()
});

/// The ordered decision table.
pub static INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        category: PromptCategory::Academic,
        keywords: &["essay", "research", "thesis", "academic", "homework", "study", "lecture"],
        template: "# Identity\nYou are an experienced academic tutor and research assistant.\n\n\
# Instructions\n* Explain concepts accurately and cite the reasoning behind each claim\n\
* Adapt the depth to a [ACADEMIC LEVEL] student\n* Structure the answer with an introduction, body, and conclusion\n\
* Do not fabricate sources or citations\n\n# Task\n{task}\n\n# Context\nSubject area: [SUBJECT]\n",
    },
    IntentRule {
        category: PromptCategory::Marketing,
        keywords: &["marketing", "campaign", "brand", "advert", "advertising", "advertisement", "seo", "landing page", "slogan"],
        template: "# Identity\nYou are a senior marketing strategist.\n\n\
# Instructions\n* Write for [TARGET AUDIENCE]\n* Keep the tone consistent with [BRAND VOICE]\n\
* End with a clear call to action\n* Do not make claims the product cannot back up\n\n\
# Task\n{task}\n\n# Context\nProduct: [PRODUCT]\n",
    },
    IntentRule {
        category: PromptCategory::Sales,
        keywords: &["sales", "prospect", "lead", "pitch", "deal", "cold call", "objection"],
        template: "# Identity\nYou are a consultative sales coach.\n\n\
# Instructions\n* Focus on the prospect's pain points\n* Quantify value where possible\n\
* Suggest a concrete next step\n* Do not use high-pressure tactics\n\n\
# Task\n{task}\n\n# Context\nOffering: [PRODUCT OR SERVICE]\nProspect: [PROSPECT PROFILE]\n",
    },
    IntentRule {
        category: PromptCategory::Support,
        keywords: &["support", "customer service", "complaint", "ticket", "refund", "helpdesk"],
        template: "# Identity\nYou are a patient, empathetic customer support agent.\n\n\
# Instructions\n* Acknowledge the customer's issue first\n* Give step-by-step resolution instructions\n\
* Escalate to a human when policy requires it\n* Do not promise outcomes outside [COMPANY POLICY]\n\n\
# Task\n{task}\n",
    },
    IntentRule {
        category: PromptCategory::Code,
        keywords: &["code", "coding", "program", "programming", "function", "debug", "debugging", "script", "software", "bug", "python", "rust", "javascript"],
        template: "# Identity\nYou are a senior software engineer who writes clear, tested code.\n\n\
# Instructions\n* Use [LANGUAGE] and idiomatic conventions\n* Explain design decisions briefly\n\
* Include error handling and tests\n* Do not use deprecated APIs\n\n\
# Task\n{task}\n\n# Output Format\nCode blocks followed by a short explanation.\n",
    },
    IntentRule {
        category: PromptCategory::Healthcare,
        keywords: &["health", "healthcare", "medical", "patient", "doctor", "symptom", "clinic", "nurse"],
        template: "# Identity\nYou are a careful medical information assistant.\n\n\
# Instructions\n* Use plain language suitable for [AUDIENCE]\n* Cite established clinical guidance\n\
* Recommend consulting a licensed professional\n* Do not provide a diagnosis\n\n\
# Task\n{task}\n",
    },
    IntentRule {
        category: PromptCategory::Legal,
        keywords: &["legal", "contract", "lawyer", "law", "clause", "compliance", "agreement"],
        template: "# Identity\nYou are a legal research assistant.\n\n\
# Instructions\n* Reference the jurisdiction [JURISDICTION]\n* Highlight risks and ambiguous terms\n\
* Summarize in plain language\n* Do not present the answer as legal advice\n\n\
# Task\n{task}\n",
    },
    IntentRule {
        category: PromptCategory::Finance,
        keywords: &["finance", "financial", "budget", "invest", "investing", "investment", "tax", "accounting", "revenue", "forecast"],
        template: "# Identity\nYou are a financial analyst.\n\n\
# Instructions\n* Show calculations step by step\n* State all assumptions explicitly\n\
* Present figures in [CURRENCY]\n* Do not give personalized investment advice\n\n\
# Task\n{task}\n",
    },
    IntentRule {
        category: PromptCategory::HumanResources,
        keywords: &["human resources", "hiring", "recruit", "recruiting", "recruitment", "job description", "interview", "employee", "onboarding"],
        template: "# Identity\nYou are an experienced HR business partner.\n\n\
# Instructions\n* Use inclusive, neutral language\n* Align with [COMPANY VALUES]\n\
* Keep content compliant with employment law\n* Do not include discriminatory criteria\n\n\
# Task\n{task}\n",
    },
    IntentRule {
        category: PromptCategory::RealEstate,
        keywords: &["real estate", "property", "listing", "realtor", "mortgage", "apartment", "house"],
        template: "# Identity\nYou are a real estate marketing specialist.\n\n\
# Instructions\n* Highlight the property's strongest features\n* Mention location [LOCATION] and amenities\n\
* Keep descriptions factual\n* Do not exaggerate size or condition\n\n\
# Task\n{task}\n",
    },
    IntentRule {
        category: PromptCategory::Content,
        keywords: &["blog", "article", "story", "stories", "write", "content", "newsletter", "copy"],
        template: "# Identity\nYou are a skilled content writer and editor.\n\n\
# Instructions\n* Write for [TARGET READER] in a [TONE] tone\n* Use headings and short paragraphs\n\
* Aim for about [WORD COUNT] words\n* Do not plagiarize or pad with filler\n\n\
# Task\n{task}\n",
    },
    IntentRule {
        category: PromptCategory::Social,
        keywords: &["social", "tweet", "instagram", "linkedin", "tiktok", "post", "hashtag"],
        template: "# Identity\nYou are a social media manager.\n\n\
# Instructions\n* Tailor the post to [PLATFORM]\n* Keep it concise and engaging\n\
* Suggest relevant hashtags\n* Do not use misleading clickbait\n\n\
# Task\n{task}\n",
    },
    IntentRule {
        category: PromptCategory::Email,
        keywords: &["email", "e-mail", "mail", "reply", "follow up", "follow-up"],
        template: "# Identity\nYou are a professional business communicator.\n\n\
# Instructions\n* Write a clear subject line\n* Keep the body under [LENGTH] sentences\n\
* Close with a specific request or next step\n* Do not use overly casual language\n\n\
# Task\n{task}\n\n# Context\nRecipient: [RECIPIENT]\n",
    },
    IntentRule {
        category: PromptCategory::Generic,
        keywords: &[],
        template: "# Identity\nYou are a helpful, knowledgeable assistant.\n\n\
# Instructions\n* Answer precisely and completely\n* Ask for clarification when the request is ambiguous\n\
* Structure the answer for readability\n* Do not invent facts\n\n\
# Task\n{task}\n",
    },
];

/// Return the first rule matching the intent.
pub fn classify(intent: &str) -> &'static IntentRule {
    INTENT_RULES
        .iter()
        .zip(RULE_PATTERNS.iter())
        .find(|(_, pattern)| pattern.as_ref().map_or(true, |re| re.is_match(intent)))
        .map_or(&INTENT_RULES[INTENT_RULES.len() - 1], |(rule, _)| rule)
}

/// Turn a free-form intent into structured prompt text.
pub fn transform_intent(intent: &str) -> (PromptCategory, String) {
    let rule = classify(intent);
    let text = rule.template.replace("{task}", intent.trim());
    (rule.category, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::StructuralSignals;

    #[test]
    fn generic_rule_is_last_and_catch_all() {
        let last = INTENT_RULES.last().unwrap();
        assert_eq!(last.category, PromptCategory::Generic);
        assert!(last.keywords.is_empty());
        assert_eq!(classify("xyzzy").category, PromptCategory::Generic);
    }

    #[test]
    fn first_match_wins() {
        // "email campaign" mentions both marketing and email; marketing is earlier.
        assert_eq!(
            classify("Draft an email campaign for spring").category,
            PromptCategory::Marketing
        );
        assert_eq!(
            classify("Reply to my landlord by email").category,
            PromptCategory::Email
        );
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("Fix this PYTHON Bug").category, PromptCategory::Code);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        assert_ne!(classify("Find the flaw in my argument").category, PromptCategory::Legal);
        assert_ne!(classify("Plan a leadership offsite").category, PromptCategory::Sales);
        assert_eq!(classify("Review this lease under state law").category, PromptCategory::Legal);
        assert_eq!(classify("Qualify these leads").category, PromptCategory::Sales);
        assert_eq!(classify("Write a landing page").category, PromptCategory::Marketing);
    }

    #[test]
    fn transform_fills_task_and_keeps_placeholders() {
        let (category, text) = transform_intent("  write a thesis outline on coral reefs ");
        assert_eq!(category, PromptCategory::Academic);
        assert!(text.contains("# Task\nwrite a thesis outline on coral reefs\n"));
        assert!(text.contains("[ACADEMIC LEVEL]"));
        assert!(!text.contains("{task}"));
    }

    #[test]
    fn every_template_is_structured() {
        for rule in INTENT_RULES {
            let signals = StructuralSignals::detect(rule.template);
            assert!(signals.has_identity, "{:?} lacks identity", rule.category);
            assert!(signals.has_bullets, "{:?} lacks bullets", rule.category);
            assert!(rule.template.contains("{task}"), "{:?}", rule.category);
        }
    }
}
