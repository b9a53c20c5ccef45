//! Query an HTML file from the command line
//!
//! Usage: `domlite <file.html> <selector> [attribute]`
//!
//! Prints the outer HTML of every match, or the value of `attribute` when given.
use domlite::dom::Document;
use domlite::{Config, DomLiteError, Lite};
use log::{debug, error};
use std::{env, fs, process};

fn run(args: &[String]) -> Result<(), DomLiteError> {
    let (path, selector, attribute) = match args {
        [path, selector] => (path, selector, None),
        [path, selector, attribute] => (path, selector, Some(attribute.as_str())),
        _ => {
            return Err(DomLiteError::GenericError(
                "usage: domlite <file.html> <selector> [attribute]".to_string(),
            ));
        }
    };
    let markup = fs::read_to_string(path)?;
    let lite = Lite::from_config(Document::parse(&markup), &Config::default())?;
    lite.mark_ready();

    let matches = lite.select(selector)?;
    debug!("{} matches for {:?} in {}", matches.len(), selector, path);
    matches.each(|element, _| match attribute {
        Some(name) => {
            if let Some(value) = element.attr(name) {
                println!("{value}");
            }
        }
        None => println!("{}", element.outer_html()),
    });
    Ok(())
}

fn main() {
    pretty_env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(err) = run(&args) {
        error!("{err}");
        eprintln!("{err}");
        process::exit(1);
    }
}
