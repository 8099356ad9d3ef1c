//! Terminal Loop
//!
//! Line-oriented front end over the same session the HTTP API uses.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use cluster_advisor::{ClusterError, Holding, Portfolio, Result, normalize_ticker};

use crate::state::AppState;

const HELP: &str = "\
Commands:
  <TICKER> | advise <TICKER>      hedge advice for one coin
  portfolio TICKER=QTY [...]      diagnose holdings (prices fetched live)
  clusters                        list clusters and their themes
  help                            show this message
  q | quit                        exit";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Advise(String),
    Portfolio(Vec<Holding>),
    Clusters,
    Help,
    Quit,
    Empty,
}

pub fn parse(line: &str) -> Result<Command> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Command::Empty);
    };

    match head.to_lowercase().as_str() {
        "q" | "quit" | "exit" => Ok(Command::Quit),
        "help" | "?" => Ok(Command::Help),
        "clusters" => Ok(Command::Clusters),
        "advise" => words
            .next()
            .map(|t| Command::Advise(normalize_ticker(t)))
            .ok_or_else(|| ClusterError::Other("usage: advise <TICKER>".into())),
        "portfolio" => {
            let holdings = words.map(parse_holding).collect::<Result<Vec<_>>>()?;
            if holdings.is_empty() {
                return Err(ClusterError::Other("usage: portfolio TICKER=QTY [...]".into()));
            }
            Ok(Command::Portfolio(holdings))
        }
        _ => Ok(Command::Advise(normalize_ticker(head))),
    }
}

fn parse_holding(token: &str) -> Result<Holding> {
    let (ticker, qty) = token
        .split_once('=')
        .ok_or_else(|| ClusterError::InvalidHolding(format!("expected TICKER=QTY, got '{token}'")))?;
    let quantity = Decimal::from_str(qty.trim())
        .map_err(|_| ClusterError::InvalidHolding(format!("'{qty}' is not a number")))?;
    Ok(Holding::new(ticker, quantity))
}

/// Read commands from stdin until `quit` or EOF
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!(
        "Crypto cluster advisor ({} assets, {} clusters). Type 'help' for commands.",
        state.session.assignment().len(),
        state.session.assignment().k()
    );

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Empty) => {}
            Ok(command) => execute(&state, command).await,
            Err(e) => println!("{e}"),
        }
    }

    Ok(())
}

async fn execute(state: &AppState, command: Command) {
    let session = &state.session;

    match command {
        Command::Advise(ticker) => match session.advise_single_asset(&ticker) {
            Ok(report) => print!("{report}"),
            Err(e) => println!("{}", e.user_message()),
        },
        Command::Portfolio(holdings) => match Portfolio::from_holdings(holdings) {
            Ok(portfolio) => {
                let prices = state.resolve_prices(&portfolio, HashMap::new()).await;
                print!("{}", session.analyze_portfolio(&portfolio, &prices));
            }
            Err(e) => println!("{}", e.user_message()),
        },
        Command::Clusters => {
            for cluster in session.snapshot::<&str>(&[]).clusters {
                println!(
                    "Cluster #{} [{}] ({}): {}",
                    cluster.cluster_id,
                    cluster.theme.short_name(),
                    cluster.members.len(),
                    cluster.members.join(", ")
                );
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Quit | Command::Empty => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bare_ticker_is_advice() {
        assert_eq!(parse("  pepe ").unwrap(), Command::Advise("PEPE".into()));
        assert_eq!(parse("advise eth").unwrap(), Command::Advise("ETH".into()));
    }

    #[test]
    fn test_control_commands() {
        assert_eq!(parse("q").unwrap(), Command::Quit);
        assert_eq!(parse("QUIT").unwrap(), Command::Quit);
        assert_eq!(parse("help").unwrap(), Command::Help);
        assert_eq!(parse("clusters").unwrap(), Command::Clusters);
        assert_eq!(parse("   ").unwrap(), Command::Empty);
    }

    #[test]
    fn test_portfolio_command() {
        let cmd = parse("portfolio btc=0.5 DOGE=1200").unwrap();
        assert_eq!(
            cmd,
            Command::Portfolio(vec![
                Holding::new("BTC", dec!(0.5)),
                Holding::new("DOGE", dec!(1200)),
            ])
        );
    }

    #[test]
    fn test_bad_quantity_is_invalid_holding() {
        assert!(matches!(parse("portfolio ETH=lots"), Err(ClusterError::InvalidHolding(_))));
        assert!(matches!(parse("portfolio ETH"), Err(ClusterError::InvalidHolding(_))));
    }

    #[test]
    fn test_missing_arguments() {
        assert!(parse("advise").is_err());
        assert!(parse("portfolio").is_err());
    }
}
