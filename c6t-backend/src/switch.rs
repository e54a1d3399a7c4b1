//! Switch statement planning
//!
//! Front ends lower `switch` by emitting IR around the scrutinee
//! expression. The strategy depends on how many cases there are and how
//! densely their values cover their range.

use c6t_common::Word;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchStrategy {
    /// No cases: evaluate and go to the default
    Empty,
    /// One case: compare and branch
    Single,
    /// Jump table indexed by `value - min`
    Dense,
    /// Sorted value/label table searched at run time
    Sparse,
}

impl fmt::Display for SwitchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchStrategy::Empty => write!(f, "empty"),
            SwitchStrategy::Single => write!(f, "single"),
            SwitchStrategy::Dense => write!(f, "dense"),
            SwitchStrategy::Sparse => write!(f, "sparse"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchCase {
    pub value: Word,
    pub label: String,
}

impl SwitchCase {
    pub fn new(value: Word, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }
}

/// IR lines to emit before and after the scrutinee's node lines.
///
/// The prelude is separate because a table must be written out before the
/// scrutinee tree is built: any command clears the nodes of the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchLowering {
    pub strategy: SwitchStrategy,
    pub prelude: Vec<String>,
    pub dispatch: Vec<String>,
}

/// IR spelling of a word; the front end prints words unsigned
fn ir_word(value: Word) -> String {
    (value as u16).to_string()
}

pub fn plan_switch(cases: &[SwitchCase], default: &str, table_label: &str) -> SwitchLowering {
    let mut sorted = cases.to_vec();
    sorted.sort_by_key(|c| c.value);

    let (first, last) = match (sorted.first(), sorted.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return SwitchLowering {
                strategy: SwitchStrategy::Empty,
                prelude: Vec::new(),
                dispatch: vec!["EVAL".to_string(), format!("JMP {default}")],
            }
        }
    };

    if sorted.len() == 1 {
        return SwitchLowering {
            strategy: SwitchStrategy::Single,
            prelude: Vec::new(),
            dispatch: vec![
                format!("CON {}", ir_word(first.value)),
                "EQU".to_string(),
                format!("BRZ {default}"),
                format!("JMP {}", first.label),
            ],
        };
    }

    let range = i32::from(last.value) - i32::from(first.value);
    let count = sorted.len() as i32;
    let mut prelude = vec!["DATA".to_string(), format!("{table_label}:")];

    if range > 0 && range <= 3 * count {
        let mut next = sorted.iter().peekable();
        for value in i32::from(first.value)..=i32::from(last.value) {
            match next.next_if(|c| i32::from(c.value) == value) {
                Some(case) => prelude.push(format!("WORD {}", case.label)),
                None => prelude.push(format!("WORD {default}")),
            }
            // Duplicate values keep the first label
            while next.next_if(|c| i32::from(c.value) == value).is_some() {}
        }
        prelude.push("CODE".to_string());
        SwitchLowering {
            strategy: SwitchStrategy::Dense,
            prelude,
            dispatch: vec![format!(
                "SWEASY {table_label},{default},{},{}",
                ir_word(first.value),
                range + 1
            )],
        }
    } else {
        for case in &sorted {
            prelude.push(format!("WORD {},{}", ir_word(case.value), case.label));
        }
        prelude.push("CODE".to_string());
        SwitchLowering {
            strategy: SwitchStrategy::Sparse,
            prelude,
            dispatch: vec![format!("SWITCH {table_label},{default},{count}")],
        }
    }
}
