//! Writes `sample_akta.txt`: a synthetic Unicorn export (UTF-16LE, tab
//! separated) with UV peaks, conductivity, gradient, pH, pressure and
//! fraction marks, for trying the analyzer without an instrument.

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use byteorder::{LittleEndian, WriteBytesExt};

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

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
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One two-column block: header, value unit, and its (volume, value) cells.
struct Block {
    header: &'static str,
    unit: &'static str,
    rows: Vec<(String, String)>,
}

fn numeric(header: &'static str, unit: &'static str, volumes: &[f64], f: impl Fn(f64) -> f64) -> Block {
    Block {
        header,
        unit,
        rows: volumes
            .iter()
            .map(|&v| (format!("{v:.3}"), format!("{:.3}", f(v))))
            .collect(),
    }
}

fn render(blocks: &[Block]) -> String {
    let mut lines = vec!["Chrom.1 sample run".to_string()];
    lines.push(
        blocks
            .iter()
            .flat_map(|b| [b.header, ""])
            .collect::<Vec<_>>()
            .join("\t"),
    );
    lines.push(
        blocks
            .iter()
            .flat_map(|b| ["ml", b.unit])
            .collect::<Vec<_>>()
            .join("\t"),
    );
    let depth = blocks.iter().map(|b| b.rows.len()).max().unwrap_or(0);
    for i in 0..depth {
        let row: Vec<&str> = blocks
            .iter()
            .flat_map(|b| match b.rows.get(i) {
                Some((x, y)) => [x.as_str(), y.as_str()],
                None => ["", ""],
            })
            .collect();
        lines.push(row.join("\t"));
    }
    lines.join("\r\n")
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    // 0 → 30 mL, 0.02 mL step
    let volumes: Vec<f64> = (0..1500).map(|i| i as f64 * 0.02).collect();
    let peaks = [(8.0, 0.4, 450.0), (12.5, 0.6, 1200.0), (13.6, 0.3, 300.0), (21.0, 0.8, 150.0)];

    let uv: Vec<f64> = volumes
        .iter()
        .map(|&v| {
            let signal: f64 = peaks.iter().map(|&(mu, s, a)| gaussian(v, mu, s, a)).sum();
            signal + rng.gauss(0.0, 1.5)
        })
        .collect();
    let uv_block = Block {
        header: "UV",
        unit: "mAU",
        rows: volumes
            .iter()
            .zip(&uv)
            .map(|(v, y)| (format!("{v:.3}"), format!("{y:.3}")))
            .collect(),
    };
    let cut_block = numeric("UV_CUT_TEMP@100,BASEM", "mAU", &volumes, |v| v * 0.0);

    let gradient = |v: f64| ((v - 5.0) / 20.0).clamp(0.0, 1.0) * 100.0;
    let cond_block = numeric("Cond", "mS/cm", &volumes, |v| 2.0 + 0.9 * gradient(v));
    let conc_block = numeric("Conc B", "%", &volumes, gradient);
    let ph_block = numeric("pH", "pH", &volumes, |v| 7.4 - 0.02 * gradient(v));
    let pressure_block = numeric("System pressure", "MPa", &volumes, |v| 0.35 + 0.002 * v);

    let fraction_block = Block {
        header: "Fraction",
        unit: "Fraction",
        rows: (0..13)
            .map(|i| (format!("{:.3}", 4.0 + 2.0 * i as f64), format!("A{}", i + 1)))
            .collect(),
    };

    let text = render(&[
        uv_block,
        cut_block,
        cond_block,
        conc_block,
        ph_block,
        pressure_block,
        fraction_block,
    ]);

    let output_path = "sample_akta.txt";
    let file = File::create(output_path).with_context(|| format!("creating {output_path}"))?;
    let mut out = BufWriter::new(file);
    out.write_u16::<LittleEndian>(0xFEFF)?;
    for unit in text.encode_utf16() {
        out.write_u16::<LittleEndian>(unit)?;
    }
    out.flush()?;

    println!("Wrote {} samples per signal to {output_path}", volumes.len());
    Ok(())
}
