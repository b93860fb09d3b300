//! Events produced while the agent answers a turn

use serde::{Deserialize, Serialize};

/// An observable step of a turn, in the order it happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    /// The named agent started handling the turn
    AgentUpdated {
        /// Agent display name
        agent_name: String,
    },
    /// The model requested a tool
    ToolCalled {
        /// Id pairing the call with its output
        call_id: String,
        /// Tool name
        name: String,
        /// Raw JSON arguments as sent by the model
        arguments: String,
    },
    /// A tool finished and its result was handed back to the model
    ToolOutput {
        /// Id of the call this output answers
        call_id: String,
        /// Tool name
        name: String,
        /// Tool message content sent to the model
        output: String,
    },
    /// The model's final answer for the turn
    MessageOutput {
        /// Answer text
        text: String,
    },
}

impl AgentEvent {
    /// Short identifier of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AgentUpdated { .. } => "agent_updated",
            Self::ToolCalled { .. } => "tool_called",
            Self::ToolOutput { .. } => "tool_output",
            Self::MessageOutput { .. } => "message_output",
        }
    }

    /// Whether this event ends the turn
    pub fn is_final(&self) -> bool {
        matches!(self, Self::MessageOutput { .. })
    }
}
