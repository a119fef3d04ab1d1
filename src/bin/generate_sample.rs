//! Generate a deterministic sample track table for trying out the engine:
//! `cargo run --bin generate_sample` writes `sample_tracks.csv`.

use trackpanda::fields;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn next_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Genre profiles: (name, base popularity, base danceability, base energy).
/// Popularity tracks danceability within a genre so the correlation heatmap
/// has something to show.
const GENRES: &[(&str, f64, f64, f64)] = &[
    ("pop", 70.0, 0.75, 0.70),
    ("rock", 55.0, 0.50, 0.85),
    ("jazz", 40.0, 0.55, 0.35),
    ("electro", 60.0, 0.85, 0.80),
    ("acoustic", 45.0, 0.45, 0.25),
];

const ARTISTS_PER_GENRE: usize = 6;
const ALBUMS_PER_ARTIST: usize = 2;
const TRACKS_PER_ALBUM: usize = 5;

fn main() {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    let output_path = "sample_tracks.csv";
    let mut writer = csv::Writer::from_path(output_path).expect("Failed to create output file");

    writer
        .write_record([
            fields::TRACK_ID,
            fields::ARTISTS,
            fields::ALBUM_NAME,
            fields::TRACK_NAME,
            fields::POPULARITY,
            fields::DURATION_MS,
            fields::EXPLICIT,
            fields::DANCEABILITY,
            fields::ENERGY,
            fields::KEY,
            fields::LOUDNESS,
            fields::MODE,
            fields::SPEECHINESS,
            fields::ACOUSTICNESS,
            fields::INSTRUMENTALNESS,
            fields::LIVENESS,
            fields::VALENCE,
            fields::TEMPO,
            fields::TIME_SIGNATURE,
            fields::TRACK_GENRE,
        ])
        .expect("Failed to write header");

    let mut track_no: u64 = 0;
    for (g, &(genre, base_popularity, base_dance, base_energy)) in GENRES.iter().enumerate() {
        for a in 0..ARTISTS_PER_GENRE {
            // A couple of collaborations per genre: one atomic combined label.
            let artist = if a == ARTISTS_PER_GENRE - 1 {
                format!("{genre} artist 1;{genre} artist {a}", a = a + 1)
            } else {
                format!("{genre} artist {}", a + 1)
            };
            for b in 0..ALBUMS_PER_ARTIST {
                let album = format!("{artist} album {}", b + 1);
                for t in 0..TRACKS_PER_ALBUM {
                    let danceability = (base_dance + rng.gauss(0.0, 0.10)).clamp(0.0, 1.0);
                    let energy = (base_energy + rng.gauss(0.0, 0.12)).clamp(0.0, 1.0);
                    let popularity = (base_popularity
                        + 25.0 * (danceability - base_dance)
                        + rng.gauss(0.0, 8.0))
                    .clamp(0.0, 100.0)
                    .round() as i64;

                    writer
                        .write_record([
                            format!("trk{:05}{}", track_no, g),
                            artist.clone(),
                            album.clone(),
                            format!("{genre} track {}", t + 1),
                            popularity.to_string(),
                            (rng.next_range(120_000.0, 360_000.0) as i64).to_string(),
                            (rng.next_f64() < 0.15).to_string(),
                            format!("{danceability:.3}"),
                            format!("{energy:.3}"),
                            ((rng.next_u64() % 12) as i64).to_string(),
                            format!("{:.2}", rng.next_range(-30.0, -2.0)),
                            ((rng.next_u64() % 2) as i64).to_string(),
                            format!("{:.3}", rng.next_range(0.02, 0.30)),
                            format!("{:.3}", (1.0 - energy).clamp(0.0, 1.0)),
                            format!("{:.3}", rng.next_f64() * 0.4),
                            format!("{:.3}", rng.next_range(0.05, 0.35)),
                            format!("{:.3}", rng.next_f64()),
                            format!("{:.1}", rng.next_range(70.0, 190.0)),
                            (3 + (rng.next_u64() % 3) as i64).to_string(),
                            genre.to_string(),
                        ])
                        .expect("Failed to write record");
                    track_no += 1;
                }
            }
        }
    }

    writer.flush().expect("Failed to flush output");
    println!("Wrote {track_no} tracks to {output_path}");
}
