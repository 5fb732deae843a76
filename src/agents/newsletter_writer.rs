use crate::agents::{news_analyst, price_analyst, AgentProfile};
use crate::constants;
use crate::contract::OutputContract;
use crate::crew::task::TaskSpec;
use crate::error::Result;

pub const ROLE: &str = "Senior Stock Analyst Writer";
pub const TASK: &str = "newsletter";

pub fn profile() -> Result<AgentProfile> {
    AgentProfile::builder(ROLE)
        .goal(
            "Analyze the price trend and the news and write an insightful, engaging \
             three-paragraph newsletter based on the stock report and the price trend.",
        )
        .backstory(
            "You are widely regarded as the best stock analyst in the market. You understand \
             complex concepts and turn them into compelling stories that resonate with a broad \
             audience. You understand macro factors and combine several theories, such as cycle \
             theory and fundamental analysis, and you can hold multiple views when analyzing anything.",
        )
        .max_iter(constants::pipeline::NEWSLETTER_WRITER_MAX_ITER)
        .memory(true)
        .allow_delegation(true)
        .build()
}

pub fn task() -> TaskSpec {
    TaskSpec::new(TASK, ROLE)
        .description(
            "Use the stock price trend and the stock news report to write an analysis and a \
             newsletter about {ticket} that is brief and highlights the most important points. \
             Focus on the price trend, the news and the fear/greed score. What should be \
             considered for the near future? Include the earlier trend analysis and news summary.",
        )
        .expected_output(
            "An eloquent three-paragraph newsletter in markdown, easy to read. It must contain:\n\n\
             - A 3-bullet executive summary under an \"Executive Summary\" heading\n\
             - Introduction: sets the overall picture and sparks interest\n\
             - Main part: the core of the analysis, including the news summary and the fear/greed scores\n\
             - Summary: key facts and a concrete trend prediction, UP, DOWN or SIDEWAYS, as the closing line",
        )
        .context([price_analyst::TASK, news_analyst::TASK])
        .contract(OutputContract::Newsletter)
}
