use agenda::config::{Config, Format};
use agenda::listing::{to_json, Listing};
use agenda::store::Agenda;
use anyhow::Result;

fn main() -> Result<()> {
    env_logger::init();

    let config = Config::from_args(std::env::args().skip(1))?;
    let agenda = Agenda::open(&config.path)?;

    if let Some(e) = agenda.load_error() {
        eprintln!("Warning: {e:#}");
    }

    match config.format {
        Format::Table => print!("{}", Listing::new(agenda.list())),
        Format::Json => println!("{}", to_json(agenda.list())?),
    }

    Ok(())
}
