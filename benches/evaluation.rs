use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use chess_core::{defs::FEN_START_POSITION, Evaluator, Position};

const TEST_POSITIONS: &[(&str, &str)] = &[
    (FEN_START_POSITION, "Starting Position"),
    ("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1", "After 1.e4"),
    ("rnbqkb1r/pppp1ppp/5n2/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 2 3", "Petrov Defense"),
    ("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 4 4", "Italian Game"),
    ("rnbqk2r/pppp1ppp/5n2/2b1p3/2B1P3/3P1N2/PPP2PPP/RNBQK2R b KQkq - 0 5", "Italian Game - Developed"),
    ("r1bq1rk1/pppp1ppp/2n2n2/2b1p3/2B1P3/3P1N2/PPP2PPP/RNBQ1RK1 w - - 6 7", "Castled Position"),
    ("r2q1rk1/ppp2ppp/2np1n2/2b1p1B1/2B1P3/3P1N2/PPP2PPP/RN1Q1RK1 w - - 0 9", "Complex Middlegame"),
    ("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", "King and Pawn Endgame"),
    ("8/8/8/8/8/8/8/K7 w - - 0 1", "Lone King"),
];

fn setup_position(fen: &str) -> Position {
    chess_core::movegen::magics::init_magics();
    chess_core::board::zobrist::init_zobrist();
    let mut pos = Position::new();
    pos.set_from_fen(fen).expect("valid FEN");
    pos
}

fn bench_evaluation_positions(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation_positions");

    for (fen, name) in TEST_POSITIONS {
        let pos = setup_position(fen);
        let mut evaluator = Evaluator::new();

        group.bench_with_input(BenchmarkId::new("eval", name), fen, |b, _| {
            b.iter(|| black_box(evaluator.eval(&pos)));
        });
    }

    group.finish();
}

fn bench_evaluation_caching(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation_caching");

    let pos = setup_position("r2q1rk1/ppp2ppp/2np1n2/2b1p1B1/2B1P3/3P1N2/PPP2PPP/RN1Q1RK1 w - - 0 9");
    let mut evaluator = Evaluator::new();

    group.bench_function("cached_evaluation", |b| {
        b.iter(|| {
            for _ in 0..10 {
                black_box(evaluator.eval(&pos));
            }
        });
    });

    group.bench_function("cache_invalidation", |b| {
        b.iter(|| {
            evaluator.clear_caches();
            black_box(evaluator.eval(&pos));
        });
    });

    group.finish();
}

fn bench_evaluation_game_phases(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation_game_phases");

    let phases = [
        ("Opening", "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2"),
        ("Middlegame", "r2q1rk1/ppp2ppp/2np1n2/2b1p1B1/2B1P3/3P1N2/PPP2PPP/RN1Q1RK1 w - - 0 9"),
        ("Endgame", "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1"),
        ("Late Endgame", "8/8/8/8/8/3k4/8/3K4 w - - 0 1"),
    ];

    for (phase_name, fen) in &phases {
        let pos = setup_position(fen);
        let mut evaluator = Evaluator::new();

        group.bench_with_input(BenchmarkId::new("evaluation", phase_name), phase_name, |b, _| {
            b.iter(|| black_box(evaluator.eval(&pos)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluation_positions, bench_evaluation_caching, bench_evaluation_game_phases);
criterion_main!(benches);
