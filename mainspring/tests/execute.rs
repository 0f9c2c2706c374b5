//! End-to-end tests of the execute harness and its configuration.

use mainspring::communication::Signal;
use mainspring::execute::{execute, Config};
use mainspring::App;

struct Ticks(u64);

fn counting_app(app: &mut App) -> Result<(), String> {
    app.insert_resource(Ticks(0)).map_err(|e| e.to_string())?;
    app.add_schedule("update").map_err(|e| e.to_string())?;
    app.add_system("update", "count", |txn| {
        txn.resource_mut::<Ticks>().map_err(|e| e.to_string())?.0 += 1;
        Ok(())
    })
    .map_err(|e| e.to_string())?;
    Ok(())
}

#[test]
fn a_tick_count_drives_that_many_ticks() {
    let config = Config {
        ticks: Some(3),
        ..Config::default()
    };
    let app = execute(config, counting_app).unwrap();
    assert_eq!(app.resource::<Ticks>().unwrap().0, 3);
}

#[test]
fn a_raised_signal_ends_the_run() {
    let stop = Signal::new(false);
    let observed = stop.clone();

    let config = Config::until_stopped(stop.clone());
    let app = execute(config, move |app| {
        counting_app(app)?;
        app.add_system("update", "raise-stop", move |txn| {
            if txn.resource::<Ticks>().map_err(|e| e.to_string())?.0 == 3 {
                stop.set(true);
            }
            Ok(())
        })
        .map_err(|e| e.to_string())
    })
    .unwrap();

    assert!(observed.get());
    assert_eq!(app.resource::<Ticks>().unwrap().0, 3);
}

#[test]
fn assembly_failures_abort_before_any_tick() {
    let result = execute(Config::once(), |_app| Err("incomplete assembly".to_owned()));
    assert_eq!(result.map(|_| ()), Err("incomplete assembly".to_owned()));
}

#[cfg(feature = "getopts")]
mod from_args {

    use super::Config;

    fn args<'a>(text: &'a [&'a str]) -> impl Iterator<Item = String> + 'a {
        text.iter().map(|s| s.to_string())
    }

    #[test]
    fn tick_counts_parse() {
        let config = Config::from_args(args(&["-t", "3"])).unwrap();
        assert_eq!(config.ticks, Some(3));

        let config = Config::from_args(args(&[])).unwrap();
        assert_eq!(config.ticks, Some(1));
    }

    #[test]
    fn looping_overrides_tick_counts() {
        let config = Config::from_args(args(&["-t", "5", "--loop"])).unwrap();
        assert_eq!(config.ticks, None);
    }

    #[test]
    fn streams_accumulate() {
        let config =
            Config::from_args(args(&["-s", "mainspring", "-s", "mainspring/comm"])).unwrap();
        assert_eq!(config.streams, vec!["mainspring", "mainspring/comm"]);
    }

    #[test]
    fn malformed_tick_counts_are_reported() {
        assert!(Config::from_args(args(&["-t", "many"])).is_err());
    }
}
