//! Pitch scrambling: permute the pitch content of attacking `**kern`
//! tokens within each track, leaving every position's rhythm code (and the
//! overall rhythmic skeleton) untouched. Rests, tied continuations, null
//! tokens and non-kern spines are never moved.

use crate::errors::ParseMode;
use crate::file::HumdrumFile;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub fn transform(file: &mut HumdrumFile, seed: Option<u64>) -> Result<()> {
    file.analyze_spines(ParseMode::Strict)?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    for track in file.kern_tracks() {
        let mut slots: Vec<(usize, usize)> = Vec::new();
        let mut pitches: Vec<String> = Vec::new();

        for (index, line) in file.data_lines() {
            for (field, token) in line.tokens.iter().enumerate() {
                if token.track != track || !token.is_attack().unwrap_or(false) {
                    continue;
                }
                if let Some((_, pitch, _)) = split_pitch(&token.text) {
                    slots.push((index, field));
                    pitches.push(pitch);
                }
            }
        }

        pitches.shuffle(&mut rng);

        let edits: Vec<(usize, usize, String)> = slots
            .iter()
            .zip(pitches)
            .filter_map(|(&(index, field), pitch)| {
                let token = file.line(index)?.token(field)?;
                let (prefix, _, suffix) = split_pitch(&token.text)?;
                Some((index, field, format!("{}{}{}", prefix, pitch, suffix)))
            })
            .collect();

        for (index, field, text) in edits {
            file.set_token_text(index, field, &text);
        }
    }

    Ok(())
}

fn is_pitch_char(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a'..='g' | 'n') || c == '#' || c == '-'
}

/// Split a token around its first contiguous run of pitch characters:
/// `(prefix, pitch, suffix)`. Returns `None` when no pitch is present.
fn split_pitch(text: &str) -> Option<(String, String, String)> {
    let start = text.find(is_pitch_char)?;
    let len = text[start..]
        .chars()
        .take_while(|&c| is_pitch_char(c))
        .map(|c| c.len_utf8())
        .sum::<usize>();
    Some((
        text[..start].to_string(),
        text[start..start + len].to_string(),
        text[start + len..].to_string(),
    ))
}
