//! Command models for CSV replay.

use crate::decimal::{parse_units, ACCOUNTING_DECIMALS};
use crate::employee::{Address, Timestamp};
use serde::Deserialize;

/// Raw command record as read from CSV.
///
/// `employee` is only used by `register` and `terminate`; `amount` (weekly
/// rate in whole accounting units, e.g. `1000.5`) only by `register`.
#[derive(Debug, Deserialize)]
pub struct CommandRecord {
    /// Command type: register, terminate, withdraw, switch, pause, unpause
    #[serde(rename = "type")]
    pub cmd_type: String,

    /// Address issuing the command
    pub caller: Address,

    /// Target employee for HR commands
    pub employee: Option<Address>,

    /// Timestamp the command executes at (seconds)
    pub time: Timestamp,

    /// Weekly rate for register
    pub amount: Option<String>,
}

impl CommandRecord {
    /// Parses the raw CSV record into a typed command.
    ///
    /// Returns `None` if the record is invalid (unknown type, missing
    /// employee or rate, etc.).
    pub fn parse(&self) -> Option<ParsedCommand> {
        let cmd_type = self.cmd_type.trim().to_lowercase();

        let kind = match cmd_type.as_str() {
            "register" => CommandKind::Register {
                employee: self.employee?,
                weekly_rate: self.parse_rate()?,
            },
            "terminate" => CommandKind::Terminate {
                employee: self.employee?,
            },
            "withdraw" => CommandKind::Withdraw,
            "switch" | "switch_currency" => CommandKind::SwitchCurrency,
            "pause" => CommandKind::Pause,
            "unpause" => CommandKind::Unpause,
            _ => return None,
        };

        Some(ParsedCommand {
            caller: self.caller,
            time: self.time,
            kind,
        })
    }

    /// Parses the amount field into accounting units.
    fn parse_rate(&self) -> Option<u128> {
        let amount_str = self.amount.as_ref()?;
        let trimmed = amount_str.trim();
        if trimmed.is_empty() {
            return None;
        }
        parse_units(trimmed, ACCOUNTING_DECIMALS)
    }
}

/// A parsed and validated command ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Address issuing the command
    pub caller: Address,

    /// Execution timestamp
    pub time: Timestamp,

    /// Command type with associated data
    pub kind: CommandKind,
}

/// Command variants with associated data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// HR registers an employee at a weekly rate (accounting units).
    Register { employee: Address, weekly_rate: u128 },

    /// HR terminates an employee.
    Terminate { employee: Address },

    /// Employee withdraws accrued pay.
    Withdraw,

    /// Employee settles and flips payout currency.
    SwitchCurrency,

    /// HR pauses payouts.
    Pause,

    /// HR resumes payouts.
    Unpause,
}
