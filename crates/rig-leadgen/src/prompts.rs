//! Prompt sets for the research loop
//!
//! The loop's control flow is the same for generic topic research and for
//! lead generation; only the prompt text and a handful of labels differ.
//! A `PromptSet` carries both.

/// Placeholder filled with today's date (`YYYY-MM-DD`)
const CURRENT_DATE: &str = "{current_date}";
/// Placeholder filled with the run's topic
const RESEARCH_TOPIC: &str = "{research_topic}";

const LEAD_QUERY_WRITER: &str = r#"You are a leads researcher assistant tasked with generating optimal search queries.

Your goal is to create a search query that will return relevant leads based on the criteria provided.

Current date: {current_date}

The lead criteria you need to search for is: {research_topic}

Follow these guidelines to create an effective search query:
1. Be specific about the type of leads needed (e.g., specific roles, industries, company sizes)
2. Use relevant keywords that would appear on LinkedIn profiles or company websites
3. Include qualifying terms that match the criteria
4. Format your output as a JSON object with a single key "query" containing your search query

For example:
```json
{"query": "your optimized lead search query here"}
```
"#;

const LEAD_SUMMARIZER: &str = r#"You are a lead generation assistant tasked with compiling valuable lead information.

Your job is to:
1. Extract promising leads from the provided search results
2. Format lead information in a structured way
3. Identify key decision-makers and their contact details when available
4. Extract relevant company information
5. Prioritize leads based on how well they match the search criteria

For LinkedIn profiles, extract key details about potential leads such as:
- Full name and current role
- Company and company size/industry
- Skills and expertise relevant to the search criteria
- Contact information if available
- Seniority level and decision-making authority

Your output should be a well-structured list of leads with all relevant information
organized in a way that makes it easy to take action on these leads.
"#;

const LEAD_REFLECTION: &str = r#"You are a lead researcher assistant tasked with improving lead search quality.

Your job is to:
1. Analyze the current lead search results for: {research_topic}
2. Identify gaps in the current set of leads (missing industries, roles, regions, etc.)
3. Determine what additional search could yield better-qualified leads
4. Format your output as a JSON object with a single key "query" containing your search query

For example:
```json
{"query": "your specific follow-up lead search query here"}
```

Consider these questions when identifying how to improve the lead search:
- Are we missing key decision-makers from specific companies?
- Are there additional job titles or roles we should target?
- Should we focus on specific industries or company sizes?
- Are there specific regions or markets we need more leads from?
- Should we search for leads with specific skills or experiences?

Your goal is to systematically improve the quality and completeness of the lead list.
"#;

const RESEARCH_QUERY_WRITER: &str = r#"You are a research assistant tasked with generating a targeted web search query.

Current date: {current_date}

The topic you need to research is: {research_topic}

Write one search query that will surface recent, authoritative sources on this topic.
Format your output as a JSON object with a single key "query" containing your search query

For example:
```json
{"query": "your search query here"}
```
"#;

const RESEARCH_SUMMARIZER: &str = r#"You are a research assistant tasked with writing a concise, well-sourced summary.

When an existing summary is provided, extend it with the new search results:
- Keep information that is still accurate
- Integrate new facts where they belong instead of appending them at the end
- Drop details that the new results contradict

When no summary exists yet, write one from the search results alone.
Do not include a preamble, a title or a list of sources; start directly with the summary.
"#;

const RESEARCH_REFLECTION: &str = r#"You are a research assistant analyzing a summary about: {research_topic}

Identify the most important knowledge gap or an area that needs deeper exploration,
then write one follow-up web search query that would fill it.
Format your output as a JSON object with a single key "query" containing your search query

For example:
```json
{"query": "your follow-up search query here"}
```
"#;

/// Prompt text and labels for one flavour of research run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub query_writer: &'static str,
    pub summarizer: &'static str,
    pub reflection: &'static str,

    /// Tag wrapping the topic in the summarize document
    pub topic_tag: &'static str,
    /// Tag wrapping the previous summary in the summarize document
    pub existing_tag: &'static str,
    /// User message for the first query generation
    pub query_request: &'static str,
    /// Lead-in for the reflection user message
    pub reflect_request: &'static str,
    /// Trailing instruction for the reflection user message
    pub reflect_instruction: &'static str,
    /// Prefix of the query used when the generated one is empty
    pub default_query_prefix: &'static str,
    /// Heading of the final output
    pub final_heading: &'static str,
    /// Final output body when no summary was produced
    pub empty_summary: &'static str,
    /// Heading of the profile section in the final output
    pub profile_section: &'static str,
    /// Tag wrapping profiles in the summarize document
    pub profile_tag: &'static str,
}

impl PromptSet {
    /// Lead generation: find people matching lead criteria
    pub fn leads() -> Self {
        Self {
            query_writer: LEAD_QUERY_WRITER,
            summarizer: LEAD_SUMMARIZER,
            reflection: LEAD_REFLECTION,
            topic_tag: "Lead Criteria",
            existing_tag: "Existing Leads",
            query_request: "Generate a query to find leads matching these criteria:",
            reflect_request: "Reflect on our existing leads:",
            reflect_instruction:
                "And now identify missing lead types and generate a follow-up search query:",
            default_query_prefix: "leads for",
            final_heading: "## Lead List",
            empty_summary: "No leads available.",
            profile_section: "## LinkedIn Profiles",
            profile_tag: "LinkedIn Profiles",
        }
    }

    /// Generic topic research
    pub fn research() -> Self {
        Self {
            query_writer: RESEARCH_QUERY_WRITER,
            summarizer: RESEARCH_SUMMARIZER,
            reflection: RESEARCH_REFLECTION,
            topic_tag: "Research Topic",
            existing_tag: "Existing Summary",
            query_request: "Generate a query for web search:",
            reflect_request: "Identify a knowledge gap and generate a follow-up web search query based on our existing knowledge:",
            reflect_instruction: "",
            default_query_prefix: "research on",
            final_heading: "## Summary",
            empty_summary: "No summary available.",
            profile_section: "## LinkedIn Profiles",
            profile_tag: "LinkedIn Profiles",
        }
    }

    /// Query-writer instructions for `topic`, dated today
    pub fn query_writer_instructions(&self, topic: &str) -> String {
        fill(self.query_writer, &current_date(), topic)
    }

    /// Reflection instructions for `topic`
    pub fn reflection_instructions(&self, topic: &str) -> String {
        fill(self.reflection, &current_date(), topic)
    }

    /// User message asking for reflection over `summary`
    pub fn reflect_message(&self, summary: &str) -> String {
        let mut message = format!("{} \n === \n {}, \n === \n", self.reflect_request, summary);
        if !self.reflect_instruction.is_empty() {
            message.push(' ');
            message.push_str(self.reflect_instruction);
        }
        message
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::leads()
    }
}

/// Today's date as `YYYY-MM-DD`
pub fn current_date() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn fill(template: &str, current_date: &str, topic: &str) -> String {
    template
        .replace(CURRENT_DATE, current_date)
        .replace(RESEARCH_TOPIC, topic)
}
