//! Fixed instruction templates for the generation-backed stages.

use pipeline::PromptTemplate;

/// Turns raw search content into structured research notes.
pub const SUMMARY: PromptTemplate = PromptTemplate::new(
    "summary",
    r#"You are a research summarizer. Take the following raw web data and extract the key insights, facts, and important points related to: "{{query}}"

Structure the notes clearly using bullet points or short paragraphs.

Raw Data:
{{raw_results}}
"#,
);

/// Synthesises a full answer from the research notes.
pub const ANALYSIS: PromptTemplate = PromptTemplate::new(
    "analysis",
    r#"You are an analysis agent. Based on the following research notes, synthesize a comprehensive and insightful answer.

1. Start with a brief introduction to the topic: "{{query}}". Explain what it is and why it matters.
2. Identify and explain the key trends or insights related to it.
3. For each point, provide at least one real-world example or case study (e.g. companies, use-cases, or recent innovations).
4. Conclude with the implications for professionals, industries, or society, and mention key skills or tools relevant to the topic.

Research Notes: {{research_notes}}
"#,
);

/// Reviews the drafted answer without rewriting it.
pub const CRITIQUE: PromptTemplate = PromptTemplate::new(
    "critique",
    r#"You are a review agent. Critically evaluate the drafted answer for the topic: "{{query}}"

Drafted Answer: {{drafted_answer}}

Check whether it:
- Starts with a clear, informative introduction
- Covers important points thoroughly
- Includes real-world examples
- Ends with a meaningful conclusion

Suggest any improvements or confirm its quality.
"#,
);

/// Every template, for up-front validation.
pub const ALL: [PromptTemplate; 3] = [SUMMARY, ANALYSIS, CRITIQUE];
