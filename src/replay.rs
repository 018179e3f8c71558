//! Batch replay of CSV command files and CSV reports.
//!
//! Commands are executed in file order (assumed chronological). A command
//! the engine rejects is logged at warn level and skipped; the replay keeps
//! going, exactly as a caller retrying nothing would observe.

use crate::command::{CommandKind, CommandRecord, ParsedCommand};
use crate::decimal::{format_units, ACCOUNTING_DECIMALS};
use crate::engine::PayrollEngine;
use crate::error::Result;
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use std::io::{Read, Write};

impl PayrollEngine {
    /// Executes commands from a CSV reader in streaming fashion.
    ///
    /// Returns the number of commands that completed.
    pub fn process_csv<R: Read>(&self, reader: R) -> Result<usize> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut applied = 0;
        for (row_idx, result) in csv_reader.deserialize::<CommandRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            match result {
                Ok(record) => {
                    if let Some(command) = record.parse() {
                        match self.execute(&command) {
                            Ok(()) => applied += 1,
                            Err(e) => warn!("Row {}: {}", row_num, e),
                        }
                    } else {
                        warn!("Row {}: Failed to parse command record", row_num);
                    }
                }
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                }
            }
        }

        Ok(applied)
    }

    /// Executes a single parsed command.
    pub fn execute(&self, command: &ParsedCommand) -> Result<()> {
        let caller = command.caller;
        let now = command.time;

        match command.kind {
            CommandKind::Register {
                employee,
                weekly_rate,
            } => self.register(caller, employee, weekly_rate, now),
            CommandKind::Terminate { employee } => self.terminate(caller, employee, now),
            CommandKind::Withdraw => {
                let settlement = self.withdraw(caller, now)?;
                debug!(
                    "Paid {} {} to {} (owed {})",
                    settlement.amount, settlement.currency, caller, settlement.owed
                );
                Ok(())
            }
            CommandKind::SwitchCurrency => self.switch_currency(caller, now).map(|_| ()),
            CommandKind::Pause => self.pause(caller),
            CommandKind::Unpause => self.unpause(caller),
        }
    }

    /// Writes the employee ledger to CSV.
    ///
    /// Output is sorted by address for deterministic results. Weekly rates
    /// are written in whole accounting units.
    pub fn write_output<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "employee",
            "weekly_rate",
            "employed_since",
            "terminated_at",
            "last_settled_at",
            "currency",
            "active",
        ])?;

        for (employee, record) in self.records() {
            csv_writer.write_record([
                employee.to_string(),
                format_units(record.weekly_rate, ACCOUNTING_DECIMALS),
                record.employed_since.to_string(),
                record.terminated_at_or_zero().to_string(),
                record.last_settled_at.to_string(),
                record.preferred_currency.to_string(),
                record.is_active().to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the event journal to CSV, in emission order.
    pub fn write_events<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["event", "employee", "currency", "amount"])?;

        for event in self.events() {
            let (currency, amount) = event.detail();
            csv_writer.write_record([
                event.name().to_string(),
                event.employee().map(|a| a.to_string()).unwrap_or_default(),
                currency,
                amount,
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::employee::{Address, Currency};
    use crate::engine::PayrollEngine;
    use crate::sim::SimulatedMarket;
    use std::io::Cursor;
    use std::sync::Arc;

    fn engine() -> (PayrollEngine, Arc<SimulatedMarket>) {
        let config = EngineConfig::with_hr(Address(1));
        let market = SimulatedMarket::new(config.treasury, 200_000_000_000, 8);
        market.fund_stable(config.treasury, 1_000_000_000_000);
        (PayrollEngine::new(config, market.collaborators()), market)
    }

    fn process_csv_str(csv: &str) -> (PayrollEngine, Arc<SimulatedMarket>) {
        let (engine, market) = engine();
        engine.process_csv(Cursor::new(csv)).unwrap();
        (engine, market)
    }

    #[test]
    fn test_register_and_withdraw() {
        let csv = r#"type,caller,employee,time,amount
register,1,100,0,1000
withdraw,100,,172800,"#;

        let (engine, market) = process_csv_str(csv);
        assert_eq!(market.stable_balance(Address(100)), 285_714_286);
        assert_eq!(engine.record(Address(100)).last_settled_at, 172_800);
    }

    #[test]
    fn test_rejected_rows_are_skipped() {
        let csv = r#"type,caller,employee,time,amount
register,7,100,0,1000
register,1,100,0,1000
bonus,1,100,0,5
withdraw,100,,0,
withdraw,100,,86400,"#;

        let (engine, _) = engine();
        let applied = engine.process_csv(Cursor::new(csv)).unwrap();
        assert_eq!(applied, 2);
        assert_eq!(engine.active_count(), 1);
    }

    #[test]
    fn test_switch_and_native_payout() {
        let csv = r#"type,caller,employee,time,amount
register,1,100,0,1000
switch,100,,0,
withdraw,100,,172800,"#;

        let (engine, market) = process_csv_str(csv);
        assert_eq!(engine.preferred_currency(Address(100)), Currency::Native);
        assert_eq!(market.native_balance(Address(100)), 142_857_143_000_000_000);
    }

    #[test]
    fn test_whitespace_handling() {
        let csv = r#"type, caller, employee, time, amount
register, 1, 100, 0, 1000
withdraw, 100, , 172800, "#;

        let (_, market) = process_csv_str(csv);
        assert_eq!(market.stable_balance(Address(100)), 285_714_286);
    }

    #[test]
    fn test_output_format() {
        let csv = r#"type,caller,employee,time,amount
register,1,200,0,500
register,1,100,0,1000.5
terminate,1,200,3600,"#;

        let (engine, _) = process_csv_str(csv);
        let mut output = Vec::new();
        engine.write_output(&mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        let lines: Vec<_> = output_str.lines().collect();
        assert_eq!(
            lines[0],
            "employee,weekly_rate,employed_since,terminated_at,last_settled_at,currency,active"
        );
        assert_eq!(lines[1], "100,1000.5,0,0,0,stable,true");
        assert_eq!(lines[2], "200,500,0,3600,0,stable,false");
    }

    #[test]
    fn test_events_output() {
        let csv = r#"type,caller,employee,time,amount
register,1,100,0,1000
withdraw,100,,172800,
pause,1,,172800,"#;

        let (engine, _) = process_csv_str(csv);
        let mut output = Vec::new();
        engine.write_events(&mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        let lines: Vec<_> = output_str.lines().collect();
        assert_eq!(lines[0], "event,employee,currency,amount");
        assert_eq!(lines[1], "registered,100,accounting,1000");
        assert_eq!(lines[2], "withdrawal,100,stable,285.714286");
        assert_eq!(lines[3], "paused,,,");
    }
}
