//! Watch bots play a dice battle to the end.
//!
//! Every player is a bot with randomly rolled units. Bots attack the
//! strongest stat of their target and sometimes hold back.

use anyhow::{Error, bail};
use dice_battle::{
    BattleResult, Event, EventKind, GameId, GameSettings, GameState, RandomDice, Session, Stat,
    UnitId, UnitSpec,
    constants::{DAMAGEABLE_STATS, MIN_PLAYERS},
};
use log::{info, warn};
use pico_args::Arguments;
use rand::{Rng, SeedableRng, rngs::StdRng};

const HELP: &str = "\
Run a dice battle between bots

USAGE:
  battle_bots [OPTIONS]

OPTIONS:
  --players    N           Number of bot players        [default: env BATTLE_PLAYERS or 2]
  --units      N           Units per player             [default: env BATTLE_UNITS or 1]
  --edges      N           Number of dice edges         [default: env BATTLE_EDGES or 6]
  --rounds     N           Round limit                  [default: env BATTLE_MAX_ROUNDS or 50]
  --seed       N           Seed for dice and bots       [default: env BATTLE_SEED or random]
  --skip-rate  P           Chance a bot skips its turn  [default: 0.1]
  --aim        STAT        Always attack this stat      [attack|defense, default: strongest]

FLAGS:
  -h, --help               Print help information
  --json                   Print every event as a JSON line

ENVIRONMENT:
  RUST_LOG                 Log filter (e.g., info, dice_battle=debug)
";

/// Upper bound on bot actions before giving up on a game.
const MAX_ACTIONS: usize = 100_000;

/// Every event kind, for the JSON printer.
const EVENT_KINDS: [EventKind; 8] = [
    EventKind::PlayerJoined,
    EventKind::DiceRolled,
    EventKind::StartGame,
    EventKind::StateChanged,
    EventKind::RoundStarted,
    EventKind::StepStarted,
    EventKind::AttackResolved,
    EventKind::GameOver,
];

const UNIT_NAMES: [&str; 6] = ["knight", "archer", "squire", "mage", "rogue", "monk"];

struct Args {
    players: usize,
    units: usize,
    edges: u32,
    max_rounds: u32,
    seed: Option<u64>,
    skip_rate: f64,
    aim: Option<Stat>,
    json: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() -> Result<(), Error> {
    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        json: pargs.contains("--json"),
        players: pargs
            .value_from_str("--players")
            .unwrap_or_else(|_| env_or("BATTLE_PLAYERS", 2)),
        units: pargs
            .value_from_str("--units")
            .unwrap_or_else(|_| env_or("BATTLE_UNITS", 1)),
        edges: pargs
            .value_from_str("--edges")
            .unwrap_or_else(|_| env_or("BATTLE_EDGES", 6)),
        max_rounds: pargs
            .value_from_str("--rounds")
            .unwrap_or_else(|_| env_or("BATTLE_MAX_ROUNDS", 50)),
        seed: pargs.opt_value_from_str("--seed").ok().flatten().or_else(|| {
            std::env::var("BATTLE_SEED")
                .ok()
                .and_then(|v| v.parse().ok())
        }),
        skip_rate: pargs.value_from_str("--skip-rate").unwrap_or(0.1),
        aim: pargs.opt_value_from_str("--aim")?,
    };

    env_logger::builder().format_target(false).init();

    if args.players < MIN_PLAYERS {
        bail!("a game needs at least {MIN_PLAYERS} bots, got {}", args.players);
    }
    if args.units == 0 {
        bail!("every bot needs at least one unit");
    }
    if let Some(stat) = args.aim
        && !DAMAGEABLE_STATS.contains(&stat)
    {
        bail!("bots can't aim at {stat}");
    }
    if !(0.0..=1.0).contains(&args.skip_rate) {
        bail!("skip rate must be between 0 and 1, got {}", args.skip_rate);
    }

    // wait for every bot before the first round starts
    let settings = GameSettings {
        min_players: args.players,
        dice_edges: args.edges,
        max_rounds: Some(args.max_rounds),
        ..GameSettings::default()
    };
    let mut session = Session::new(settings)?;

    if args.json {
        for kind in EVENT_KINDS {
            session.observe(kind, print_event);
        }
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    for i in 0..args.players {
        let units = (0..args.units)
            .map(|u| {
                let name = format!("{}{u}", UNIT_NAMES[rng.random_range(0..UNIT_NAMES.len())]);
                UnitSpec::new(&name, rng.random_range(1..=6), rng.random_range(1..=6))
            })
            .collect();
        session.add_player(&format!("bot{i}"), units)?;
    }

    let dice = match args.seed {
        Some(seed) => RandomDice::seeded(seed),
        None => RandomDice::new(),
    };
    info!(
        "Opening a game for {} bots with {} unit(s) each",
        args.players, args.units
    );
    let game = session.open_game(dice)?;
    let joined = session.game(game)?.players().len();
    if joined != args.players {
        bail!("only {joined} of {} bots joined {game}", args.players);
    }

    play(&mut session, game, &mut rng, &args)?;

    let finished = session.game(game)?;
    match finished.winner() {
        Some(winner) => info!(
            "{} wins after {} round(s)",
            session.player(winner)?.name(),
            finished.round()
        ),
        None => info!("Draw after {} round(s)", finished.round()),
    }

    Ok(())
}

fn print_event(_: &mut Session, event: &Event) -> BattleResult<()> {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(error) => warn!("Failed to encode {} event: {error}", event.kind()),
    }
    Ok(())
}

/// Drive `game` until it finishes, taking every bot decision with `rng`.
fn play(
    session: &mut Session,
    game: GameId,
    rng: &mut StdRng,
    args: &Args,
) -> Result<(), Error> {
    for _ in 0..MAX_ACTIONS {
        let current = session.game(game)?;
        match current.state() {
            Some(GameState::Finished(_)) => return Ok(()),
            Some(GameState::StepStarted(_)) => {
                let Some(attacker) = current.active_unit() else {
                    bail!("{game} has a step without an attacker");
                };
                if rng.random_bool(args.skip_rate) {
                    info!("{} holds back", session.unit(attacker)?.name());
                    session.skip(attacker)?;
                } else {
                    let stat = match args.aim {
                        Some(stat) => stat,
                        None => choose_stat(session, game, attacker, rng)?,
                    };
                    session.attack(attacker, stat)?;
                }
            }
            Some(GameState::Stepped(_)) => session.start_step(game)?,
            other => bail!("game stuck in {other:?}"),
        }
    }
    bail!("game did not finish within {MAX_ACTIONS} actions")
}

/// Pick the target's strongest allowed stat, breaking ties at random.
fn choose_stat(
    session: &Session,
    game: GameId,
    attacker: UnitId,
    rng: &mut StdRng,
) -> Result<Stat, Error> {
    let allowed = session.unit(attacker)?.allowed();
    let Some(target) = session
        .game(game)?
        .units()
        .iter()
        .copied()
        .find(|unit| *unit != attacker)
    else {
        bail!("{} has nobody to attack", session.unit(attacker)?.name());
    };
    let target = session.unit(target)?;

    let best = allowed
        .iter()
        .map(|stat| target.stat(*stat))
        .max()
        .unwrap_or_default();
    let candidates: Vec<Stat> = allowed
        .iter()
        .copied()
        .filter(|stat| target.stat(*stat) == best)
        .collect();

    match candidates.len() {
        0 => bail!("{} has no stat it may attack", session.unit(attacker)?.name()),
        n => Ok(candidates[rng.random_range(0..n)]),
    }
}
