use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use chordfall::config::JudgeConfig;
use chordfall::model::{ChartQueue, Lane, Note};
use chordfall::play::{CandidateChord, NotePool, judge_chord};

fn chord_pool() -> NotePool {
    let mut notes = Vec::new();
    for beat in 0..64 {
        let time = beat as f64 * 0.5;
        notes.push(Note::normal(Lane::Key1, time));
        notes.push(Note::normal(Lane::Key3, time));
        notes.push(Note::normal(Lane::Key5, time));
    }
    NotePool::new(ChartQueue::new(notes).expect("bench chart is valid"))
}

fn judge_benchmark(c: &mut Criterion) {
    let config = JudgeConfig::default();

    let mut group = c.benchmark_group("judge");

    group.bench_function("perfect_chord", |b| {
        let chord = CandidateChord {
            lanes: [Lane::Key1, Lane::Key3, Lane::Key5].into_iter().collect(),
            anchor_secs: 8.0,
        };
        b.iter_batched(
            chord_pool,
            |mut pool| judge_chord(&config, &mut pool, black_box(&chord)),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("ghost_press", |b| {
        let chord = CandidateChord {
            lanes: [Lane::Key2].into_iter().collect(),
            anchor_secs: 8.2,
        };
        b.iter_batched(
            chord_pool,
            |mut pool| judge_chord(&config, &mut pool, black_box(&chord)),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn advance_benchmark(c: &mut Criterion) {
    let config = JudgeConfig::default();

    c.bench_function("advance_full_chart", |b| {
        b.iter_batched(
            chord_pool,
            |mut pool| pool.advance(black_box(40.0), config.chord_time_tolerance_secs),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, judge_benchmark, advance_benchmark);
criterion_main!(benches);
