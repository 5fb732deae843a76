use crate::agents::AgentProfile;
use crate::constants;
use crate::contract::OutputContract;
use crate::crew::task::TaskSpec;
use crate::error::Result;
use crate::tools::ToolKind;

pub const ROLE: &str = "Senior Stock Price Analyst";
pub const TASK: &str = "price_trend";

pub fn profile() -> Result<AgentProfile> {
    AgentProfile::builder(ROLE)
        .goal("Find the {ticket} stock price history and analyze its trend")
        .backstory(
            "You are highly experienced in analyzing the price of a specific stock \
             and making predictions about its future price.",
        )
        .max_iter(constants::pipeline::PRICE_ANALYST_MAX_ITER)
        .memory(true)
        .tool(ToolKind::PriceHistory)
        .allow_delegation(false)
        .build()
}

pub fn task() -> TaskSpec {
    TaskSpec::new(TASK, ROLE)
        .description(
            "Analyze the {ticket} stock price history and classify the trend as \
             up, down or sideways.",
        )
        .expected_output(
            "The current price trend of the stock, exactly one of UP, DOWN or SIDEWAYS, \
             written with the ticket symbol, for example: stock= '{ticket}, price UP'.",
        )
        .tool_inputs(["{ticket}"])
        .contract(OutputContract::PriceTrend {
            ticket: "{ticket}".to_string(),
        })
}
