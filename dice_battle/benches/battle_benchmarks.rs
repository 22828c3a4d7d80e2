use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dice_battle::{
    Event, EventKind, GameId, GameSettings, GameState, NullTelemetry, ScriptedDice, Session, Stat,
    UnitSpec,
};
use std::hint::black_box;

/// Helper to create a session with `n_players` one-unit players and no logging
fn setup_session(n_players: usize) -> Session {
    let mut session = Session::default().with_telemetry(NullTelemetry);
    for i in 0..n_players {
        let name = format!("player{i}");
        let unit = format!("unit{i}");
        session
            .add_player(&name, vec![UnitSpec::new(&unit, 3 + i as u32 % 3, 4)])
            .unwrap();
    }
    session
}

/// Attack with each active unit and step on until the game finishes.
fn play_out(session: &mut Session, game: GameId) {
    loop {
        let current = session.game(game).unwrap();
        match current.state() {
            Some(GameState::StepStarted(_)) => {
                let attacker = current.active_unit().unwrap();
                session.attack(attacker, Stat::Defense).unwrap();
            }
            Some(GameState::Stepped(_)) => session.start_step(game).unwrap(),
            _ => return,
        }
    }
}

/// Benchmark a whole scripted two-player game
fn bench_full_game(c: &mut Criterion) {
    c.bench_function("full_scripted_game", |b| {
        b.iter(|| {
            let mut session = setup_session(2);
            let game = session
                .open_game(ScriptedDice::new([6, 1, 5, 2, 4, 3]))
                .unwrap();
            play_out(&mut session, game);
            black_box(session.game(game).unwrap().winner())
        });
    });
}

/// Benchmark games with more players, each rolling on a twelve-sided die
fn bench_game_by_player_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("game_by_player_count");

    for n_players in [2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(n_players),
            &n_players,
            |b, &n| {
                b.iter(|| {
                    // every player has to join before the first round
                    let settings = GameSettings {
                        min_players: n,
                        dice_edges: 12,
                        max_rounds: Some(10),
                        ..GameSettings::default()
                    };
                    let mut session = Session::new(settings)
                        .unwrap()
                        .with_telemetry(NullTelemetry);
                    for i in 0..n {
                        session
                            .add_player(
                                &format!("player{i}"),
                                vec![UnitSpec::new("unit", 4, 4)],
                            )
                            .unwrap();
                    }
                    let script: Vec<u32> = (1..=12).rev().collect();
                    let game = session.open_game(ScriptedDice::new(script)).unwrap();
                    play_out(&mut session, game);
                    black_box(session.game(game).unwrap().round())
                });
            },
        );
    }

    group.finish();
}

/// Benchmark delivering one event to many observers
fn bench_bus_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("bus_fan_out");

    for n_observers in [1, 16, 256] {
        let mut session = setup_session(1);
        let sender = session.players()[0].id();
        for _ in 0..n_observers {
            session.observe(EventKind::StartGame, |_, event| {
                black_box(event.kind());
                Ok(())
            });
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(n_observers),
            &n_observers,
            |b, _| {
                b.iter(|| session.notify(Event::new(EventKind::StartGame, sender)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_full_game,
    bench_game_by_player_count,
    bench_bus_fan_out,
);
criterion_main!(benches);
