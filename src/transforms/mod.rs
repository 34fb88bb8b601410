pub mod barnum;
pub mod scramble;

use crate::errors::ParseMode;
use crate::file::HumdrumFile;
use crate::rhythm::RhythmOptions;
use anyhow::Result;

/// Explicit configuration for the CLI driver; one field per flag, no
/// process-wide state.
#[derive(Debug, Clone, Default)]
pub struct TransformDescriptor {
    pub renumber: bool,
    pub start_number: i32,
    pub number_all: bool,
    pub remove_numbers: bool,
    pub scramble: bool,
    pub seed: Option<u64>,
    pub timebase: i64,
    pub mode: ParseMode,
}

pub fn apply_transforms(file: &mut HumdrumFile, transforms: &TransformDescriptor) -> Result<()> {
    let opts = RhythmOptions {
        timebase: if transforms.timebase > 0 {
            transforms.timebase
        } else {
            4
        },
        mode: transforms.mode,
        ..Default::default()
    };

    // order is important here

    if transforms.scramble {
        scramble::transform(file, transforms.seed)?;
    }

    if transforms.remove_numbers || transforms.renumber {
        let config = barnum::BarnumConfig {
            start_number: transforms.start_number,
            number_all: transforms.number_all,
            remove_numbers: transforms.remove_numbers,
        };
        barnum::transform(file, &config, &opts)?;
    }

    Ok(())
}
