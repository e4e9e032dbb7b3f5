//! Interactive terminal browser (`foodcat browse`).
//!
//! Reads one command per line from stdin, turns it into a [`Navigation`]
//! candidate, fetches it through [`CatalogClient`] and commits the result
//! into the [`BrowserView`]. Fetch errors are logged and the previous page
//! stays on screen.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::client::CatalogClient;
use crate::models::Grade;
use crate::view::{BrowserView, Navigation};

const HELP: &str = "\
commands:
  n, next          next page
  p, prev          previous page
  g <page>         go to page
  f <text>         filter by name, brand or category (empty clears)
  s <grade>        filter by nutriscore A-E, '-' clears
  c, clear         clear all filters
  r                reload current page
  h, help          this help
  q, quit          exit";

/// A parsed browser command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Goto(i64),
    Filter(String),
    Grade(Option<Grade>),
    Clear,
    Refresh,
    Help,
    Quit,
}

/// Parse one input line. Blank input reloads the current page.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };

    match head.to_ascii_lowercase().as_str() {
        "" | "r" | "reload" => Ok(Command::Refresh),
        "n" | "next" => Ok(Command::Next),
        "p" | "prev" => Ok(Command::Prev),
        "g" | "goto" => rest
            .parse::<i64>()
            .map(Command::Goto)
            .map_err(|_| format!("not a page number: '{}'", rest)),
        "f" | "filter" => Ok(Command::Filter(rest.to_string())),
        "s" | "score" => match rest {
            "" | "-" => Ok(Command::Grade(None)),
            grade => grade
                .parse::<Grade>()
                .map(|g| Command::Grade(Some(g))),
        },
        "c" | "clear" => Ok(Command::Clear),
        "h" | "help" | "?" => Ok(Command::Help),
        "q" | "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command: '{}' (h for help)", other)),
    }
}

/// Fetch `nav` and commit it on success. Returns whether the view changed.
async fn load(client: &CatalogClient, view: &mut BrowserView, nav: Navigation) -> bool {
    match client.list_products(&view.request(&nav)).await {
        Ok(page) => {
            view.commit(nav, page);
            true
        }
        Err(e) => {
            error!("Failed to load products: {e:#}");
            false
        }
    }
}

pub async fn run_browse(api_base: &str, page_size: i64) -> Result<()> {
    let client = CatalogClient::new(api_base);
    let mut view = BrowserView::new(page_size);
    info!("Browsing {}", api_base);

    let initial = view.refresh();
    if load(&client, &mut view, initial).await {
        println!("{}", view.render());
    }
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(c) => c,
            Err(msg) => {
                eprintln!("{}", msg);
                continue;
            }
        };

        let nav = match command {
            Command::Quit => break,
            Command::Help => {
                println!("{}", HELP);
                continue;
            }
            Command::Next => match view.next() {
                Some(nav) => nav,
                None => {
                    eprintln!("already on the last page");
                    continue;
                }
            },
            Command::Prev => match view.prev() {
                Some(nav) => nav,
                None => {
                    eprintln!("already on the first page");
                    continue;
                }
            },
            Command::Goto(page) => view.goto(page),
            Command::Filter(text) => view.with_filter(&text, view.navigation().grade),
            Command::Grade(grade) => {
                let text = view.navigation().filter_text.clone();
                view.with_filter(&text, grade)
            }
            Command::Clear => view.with_filter("", None),
            Command::Refresh => view.refresh(),
        };

        load(&client, &mut view, nav).await;
        println!("{}", view.render());
    }

    Ok(())
}
