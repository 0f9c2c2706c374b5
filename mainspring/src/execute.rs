//! Starts a mainspring app from configuration information and assembly logic.

use crate::app::App;
use crate::logging::{AppEvent, APP_STREAM};
use mainspring_communication::logging::{ActorEvent, COMM_STREAM};
use mainspring_communication::Signal;

/// How an [`execute`] invocation drives the assembled app.
#[derive(Clone, Debug)]
pub struct Config {
    /// The number of ticks to run; `None` runs until [`Config::stop`] reads
    /// true.
    pub ticks: Option<u64>,
    /// The stop signal consulted when `ticks` is `None`.
    pub stop: Option<Signal<bool>>,
    /// Names of log streams echoed to stderr.
    pub streams: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ticks: Some(1),
            stop: None,
            streams: Vec::new(),
        }
    }
}

impl Config {
    /// A configuration driving a single tick.
    pub fn once() -> Self {
        Config::default()
    }

    /// A configuration running until `stop` reads true.
    pub fn until_stopped(stop: Signal<bool>) -> Self {
        Config {
            ticks: None,
            stop: Some(stop),
            streams: Vec::new(),
        }
    }
}

#[cfg(feature = "getopts")]
impl Config {
    /// Constructs a configuration by parsing supplied text arguments.
    ///
    /// Most commonly, this uses `std::env::args()` as the supplied iterator.
    /// Recognized arguments:
    ///
    /// * `-t`, `--ticks NUM`: number of ticks to run (default one).
    /// * `-l`, `--loop`: run until the stop signal is raised, ignoring `-t`.
    /// * `-s`, `--stream NAME`: echo a log stream to stderr; may repeat.
    pub fn from_args<I: Iterator<Item = String>>(args: I) -> Result<Config, String> {
        let mut opts = getopts::Options::new();
        opts.optopt("t", "ticks", "number of ticks to run", "NUM");
        opts.optflag("l", "loop", "run until the stop signal is raised");
        opts.optmulti("s", "stream", "echo a log stream to stderr", "NAME");

        let matches = opts.parse(args).map_err(|e| format!("{:?}", e))?;

        let ticks = match matches.opt_str("t") {
            Some(text) => Some(text.parse::<u64>().map_err(|e| format!("{:?}", e))?),
            None => Some(1),
        };
        let ticks = if matches.opt_present("l") { None } else { ticks };

        Ok(Config {
            ticks,
            stop: None,
            streams: matches.opt_strs("s"),
        })
    }
}

/// Assembles an app and drives it according to the configuration.
///
/// The `logic` closure receives the freshly created app to register its
/// schedules, systems, and resources. If `logic` binds no runner, the
/// default runner (one tick per run) is bound. The app then runs the
/// configured number of ticks, or until the configured stop signal reads
/// true, and is returned for inspection. Assembly and tick failures are
/// rendered into the error string.
///
/// # Examples
///
/// ```
/// use mainspring::execute::{execute, Config};
///
/// struct Count(u64);
///
/// let app = execute(Config { ticks: Some(3), ..Config::default() }, |app| {
///     app.insert_resource(Count(0)).map_err(|e| e.to_string())?;
///     app.add_schedule("update").map_err(|e| e.to_string())?;
///     app.add_system("update", "count", |txn| {
///         txn.resource_mut::<Count>().map_err(|e| e.to_string())?.0 += 1;
///         Ok(())
///     })
///     .map_err(|e| e.to_string())?;
///     Ok(())
/// })
/// .unwrap();
///
/// assert_eq!(app.resource::<Count>().unwrap().0, 3);
/// ```
pub fn execute<F>(config: Config, logic: F) -> Result<App, String>
where
    F: FnOnce(&mut App) -> Result<(), String>,
{
    let mut app = App::new();
    bind_streams(&app, &config.streams);

    logic(&mut app)?;

    if !app.has_runner() {
        app.set_runner(App::run_once);
    }

    match config.ticks {
        Some(ticks) => {
            for _ in 0..ticks {
                app.run().map_err(|error| error.to_string())?;
            }
        }
        None => {
            let stop = config.stop.unwrap_or_else(|| Signal::new(false));
            app.run_until_stopped(&stop)
                .map_err(|error| error.to_string())?;
        }
    }
    Ok(app)
}

/// Assembles an app and runs a single tick.
///
/// This method is intended for examples and tests; it aggressively unwraps
/// assembly and tick failures.
///
/// # Examples
///
/// ```
/// mainspring::example(|app| {
///     app.add_schedule("update").unwrap();
///     app.add_system("update", "greet", |_txn| {
///         println!("hello");
///         Ok(())
///     })
///     .unwrap();
/// });
/// ```
pub fn example<F: FnOnce(&mut App)>(logic: F) -> App {
    execute(Config::once(), |app| {
        logic(app);
        Ok(())
    })
    .expect("example app failed")
}

/// Binds stderr echo loggers for the requested stream names.
fn bind_streams(app: &App, streams: &[String]) {
    for stream in streams {
        match stream.as_str() {
            APP_STREAM => {
                app.log_register().insert::<AppEvent, _>(APP_STREAM, |_, batch| {
                    for (elapsed, event) in batch {
                        eprintln!("{:?}\t{:?}", elapsed, event);
                    }
                });
            }
            COMM_STREAM => {
                app.log_register().insert::<ActorEvent, _>(COMM_STREAM, |_, batch| {
                    for (elapsed, event) in batch {
                        eprintln!("{:?}\t{:?}", elapsed, event);
                    }
                });
            }
            unknown => {
                eprintln!("ignoring unknown log stream {:?}", unknown);
            }
        }
    }
}
