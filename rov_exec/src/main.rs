//! Main rover-side executable entry point.
//! 
//! # Architecture
//! 
//! The general execution methodology consists of:
//! 
//!     - Initialise all modules
//!     - Main loop:
//!         - Telemetry acquisition from the simulation client
//!         - Perception processing:
//!             - Rectification and classification of the camera frame
//!             - World map accumulation
//!         - Decision processing
//!         - Archiving of the cycle's demands
//!     - Export of the world map

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use rov_lib::{
    data_store::DataStore,
    decision::DecisionCtrl,
    per::PerMgr,
    sim_client::SimClient,
};
use util::{
    archive::Archiver,
    logger::{self, logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle when running in real time.
const CYCLE_PERIOD_S: f64 = 0.04;

/// Number of cycles between summary log messages.
const SUMMARY_PERIOD_CYCLES: u64 = 100;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "rov_exec", about = "Rover perception and decision executable")]
struct Opts {
    /// Path to the recorded telemetry (newline-delimited JSON)
    #[structopt(parse(from_os_str))]
    telemetry: PathBuf,

    /// Pace cycles to the simulator tick period
    #[structopt(long)]
    realtime: bool,

    /// Stop after this many cycles
    #[structopt(long)]
    max_cycles: Option<u64>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "rov_exec", 
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Rover Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let per_mgr = PerMgr::init("per_mgr.toml")
        .wrap_err("Failed to initialise PerMgr")?;
    info!("PerMgr init complete");

    let decision = DecisionCtrl::init("decision.toml")
        .wrap_err("Failed to initialise DecisionCtrl")?;
    info!("DecisionCtrl init complete");

    let mut ds = DataStore::new(&per_mgr);

    let mut archiver = Archiver::from_path(&session, "ticks.csv")
        .wrap_err("Failed to create the tick archive")?;

    info!("Module initialisation complete\n");

    // ---- INITIALISE TELEMETRY SOURCE ----

    let mut sim_client = SimClient::open(&opts.telemetry)
        .wrap_err_with(|| format!("Failed to open telemetry from {:?}", opts.telemetry))?;
    info!("SimClient reading from {:?}", opts.telemetry);

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {

        if let Some(max) = opts.max_cycles {
            if ds.num_cycles >= max {
                info!("Maximum number of cycles ({}) reached", max);
                break;
            }
        }

        // Get cycle start time
        let cycle_start_instant = Instant::now();
        logger::set_cycle(ds.num_cycles);

        // ---- DATA INPUT ----

        let tlm = match sim_client.next_telemetry()
            .wrap_err("Failed to read telemetry")?
        {
            Some(t) => t,
            None => {
                info!("End of telemetry reached");
                break;
            }
        };

        // ---- PERCEPTION AND DECISION ----

        let dems = ds.step(&tlm, &per_mgr, &decision);

        if dems.send_pickup {
            info!("Pickup requested on cycle {}", ds.num_cycles - 1);
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = archiver.serialise(ds.tick_record()) {
            warn!("Could not archive cycle {}: {}", ds.num_cycles - 1, e);
        }

        if ds.num_cycles % SUMMARY_PERIOD_CYCLES == 0 {
            info!(
                "Cycle {}: mode {}, {} samples collected, map {}",
                ds.num_cycles,
                ds.rover.mode,
                ds.rover.rocks_collected,
                ds.world_map.summary()
            );
        }

        // ---- CYCLE MANAGEMENT ----

        if opts.realtime {
            let cycle_dur = Instant::now() - cycle_start_instant;

            // Get sleep duration
            match Duration::from_secs_f64(CYCLE_PERIOD_S)
                .checked_sub(cycle_dur)
            {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Cycle overran by {:.06} s", 
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                ),
            }
        }
    }

    // ---- SHUTDOWN ----

    info!(
        "Ran {} cycles, {} telemetry lines rejected, {} samples collected",
        ds.num_cycles,
        sim_client.num_rejected(),
        ds.rover.rocks_collected
    );
    info!("Final world map: {}", ds.world_map.summary());

    session.save("world_map.json", ds.world_map.clone());

    let map_img_path = session.session_root.join("world_map.png");
    if let Err(e) = ds.world_map.save_image(&map_img_path) {
        warn!("Could not save the world map image to {:?}: {}", map_img_path, e);
    }

    info!("End of execution");

    session.exit();

    Ok(())
}
