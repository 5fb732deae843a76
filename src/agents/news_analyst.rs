use crate::agents::AgentProfile;
use crate::constants;
use crate::contract::OutputContract;
use crate::crew::task::TaskSpec;
use crate::error::Result;
use crate::tools::ToolKind;

pub const ROLE: &str = "Stock News Analyst";
pub const TASK: &str = "news_sentiment";

pub fn profile() -> Result<AgentProfile> {
    AgentProfile::builder(ROLE)
        .goal(
            "Write a short summary of the market news about {ticket}. State the current \
             trend (UP, DOWN or SIDEWAYS) in light of the news. For every requested asset \
             give a number between 0 and 100, where 0 is extreme fear and 100 is extreme greed.",
        )
        .backstory(
            "You have followed markets and their news for more than 10 years and are a \
             master-level analyst of traditional markets with a deep understanding of human \
             psychology. You read headlines and their content with a healthy dose of \
             skepticism, and you weigh the source of every article.",
        )
        .max_iter(constants::pipeline::NEWS_ANALYST_MAX_ITER)
        .memory(true)
        .tool(ToolKind::NewsSearch)
        .allow_delegation(false)
        .build()
}

pub fn task() -> TaskSpec {
    TaskSpec::new(TASK, ROLE)
        .description(
            "Take the stock {ticket} and always include {secondary_asset} with it, even if it \
             was not requested. Use the search tool to research each asset individually.\n\n\
             The current date is {current_date}.\n\n\
             Compose the results into a useful report.",
        )
        .expected_output(
            "A summary of the overall market and a one-sentence summary for each requested \
             asset. Include a fear/greed score for each asset based on the news. Use the format:\n\
             <STOCK ASSET>\n<NEWS-BASED SUMMARY>\n<TREND PREDICTION: UP, DOWN or SIDEWAYS>\n\
             <FEAR/GREED SCORE: integer 0-100>",
        )
        .tool_inputs(["{ticket}", "{secondary_asset}"])
        .contract(OutputContract::NewsSentiment {
            assets: vec!["{ticket}".to_string(), "{secondary_asset}".to_string()],
        })
}
