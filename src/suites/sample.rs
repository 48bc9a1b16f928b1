//! Pitch and interval helpers with their checks and documented examples

use std::io::Write;

use crate::interp::{CalcEnvironment, Raised, Value};
use crate::registry::check::{self, CheckResult};
use crate::registry::{Module, ModuleRegistry, StateContext};

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const INTERVAL_NAMES: [&str; 13] = [
    "unison",
    "minor second",
    "major second",
    "minor third",
    "major third",
    "perfect fourth",
    "tritone",
    "perfect fifth",
    "minor sixth",
    "major sixth",
    "minor seventh",
    "major seventh",
    "octave",
];

/// MIDI note number of a scientific pitch name such as `C4`, `F#3` or `Bb-1`
pub fn midi_number(name: &str) -> Option<i64> {
    let mut chars = name.chars();
    let class = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let rest = chars.as_str();
    let (shift, octave) = match rest.chars().next()? {
        '#' => (1, &rest[1..]),
        'b' => (-1, &rest[1..]),
        _ => (0, rest),
    };
    let octave: i64 = octave.parse().ok()?;
    let number = (octave + 1) * 12 + class + shift;
    (0..=127).contains(&number).then_some(number)
}

/// Sharp-spelled name of a MIDI note number
pub fn midi_name(number: i64) -> Option<String> {
    if !(0..=127).contains(&number) {
        return None;
    }
    Some(format!(
        "{}{}",
        SHARP_NAMES[(number % 12) as usize],
        number / 12 - 1
    ))
}

/// Equal-tempered frequency with A4 at 440 Hz
pub fn frequency(number: i64) -> f64 {
    440.0 * 2f64.powf((number - 69) as f64 / 12.0)
}

pub fn interval_name(semitones: i64) -> Option<&'static str> {
    usize::try_from(semitones)
        .ok()
        .and_then(|i| INTERVAL_NAMES.get(i).copied())
}

fn pitch_arg(function: &str, args: &[Value], index: usize) -> Result<i64, Raised> {
    match args.get(index) {
        Some(Value::Str(name)) => midi_number(name)
            .ok_or_else(|| Raised::value_error(format!("invalid pitch name '{name}'"))),
        Some(Value::Int(number)) if (0..=127).contains(number) => Ok(*number),
        Some(Value::Int(number)) => Err(Raised::value_error(format!(
            "MIDI number {number} out of range"
        ))),
        Some(other) => Err(Raised::type_error(format!(
            "{function}() expects a pitch name or MIDI number, not '{}'",
            other.type_name()
        ))),
        None => Err(Raised::type_error(format!(
            "{function}() missing required argument"
        ))),
    }
}

fn native_midi_number(args: &[Value]) -> Result<Value, Raised> {
    pitch_arg("midi_number", args, 0).map(Value::Int)
}

fn native_midi_name(args: &[Value]) -> Result<Value, Raised> {
    let number = pitch_arg("midi_name", args, 0)?;
    midi_name(number)
        .map(Value::Str)
        .ok_or_else(|| Raised::value_error(format!("MIDI number {number} out of range")))
}

fn native_frequency(args: &[Value]) -> Result<Value, Raised> {
    pitch_arg("frequency", args, 0).map(|n| Value::Float(frequency(n)))
}

fn native_semitones(args: &[Value]) -> Result<Value, Raised> {
    let low = pitch_arg("semitones", args, 0)?;
    let high = pitch_arg("semitones", args, 1)?;
    Ok(Value::Int(high - low))
}

fn native_interval_name(args: &[Value]) -> Result<Value, Raised> {
    match args.first() {
        Some(Value::Int(n)) => interval_name(*n)
            .map(|name| Value::Str(name.to_string()))
            .ok_or_else(|| Raised::value_error(format!("no interval name for {n} semitones"))),
        _ => Err(Raised::type_error("interval_name() expects an integer")),
    }
}

fn pitch_environment() -> CalcEnvironment {
    CalcEnvironment::new()
        .with_native("midi_number", native_midi_number)
        .with_native("midi_name", native_midi_name)
        .with_native("frequency", native_frequency)
}

fn interval_environment() -> CalcEnvironment {
    pitch_environment()
        .with_native("semitones", native_semitones)
        .with_native("interval_name", native_interval_name)
}

fn test_middle_c(_: &mut StateContext) -> CheckResult {
    check::equal(midi_number("C4"), Some(60))
}

fn test_enharmonic_spellings(_: &mut StateContext) -> CheckResult {
    check::equal(midi_number("Db4"), midi_number("C#4"))?;
    check::equal(midi_number("Cb4"), midi_number("B3"))
}

fn test_names_round_trip(_: &mut StateContext) -> CheckResult {
    for number in 0..=127 {
        let name = midi_name(number).ok_or_else(|| anyhow::anyhow!("no name for {number}"))?;
        check::equal(midi_number(&name), Some(number))?;
    }
    Ok(())
}

fn test_rejects_bad_names(_: &mut StateContext) -> CheckResult {
    for name in ["", "H2", "C", "C#", "Cx4", "G#9"] {
        check::that(midi_number(name).is_none(), format!("{name:?} parsed"))?;
    }
    Ok(())
}

fn test_concert_pitch(_: &mut StateContext) -> CheckResult {
    check::almost_equal(frequency(69), 440.0, 9)?;
    check::almost_equal(frequency(60), 261.625565, 5)
}

fn test_frequencies_increase(ctx: &mut StateContext) -> CheckResult {
    let mut previous = 0.0;
    for number in 0..=127 {
        let current = frequency(number);
        check::that(current > previous, format!("frequency({number}) did not increase"))?;
        previous = current;
    }
    ctx.set("highest", Value::Float(previous));
    check::that(ctx.get("highest").is_some(), "context lost a value")
}

fn test_octave_doubling_everywhere(_: &mut StateContext) -> CheckResult {
    for number in 0..=115 {
        check::almost_equal(frequency(number + 12) / frequency(number), 2.0, 9)?;
    }
    Ok(())
}

/// Writes a scale listing outside the process; only run when named
fn test_write_scale_file(_: &mut StateContext) -> CheckResult {
    let path = std::env::temp_dir().join(format!("tessitura-scale-{}.txt", std::process::id()));
    let mut file = std::fs::File::create(&path).map_err(anyhow::Error::from)?;
    for name in ["C4", "D4", "E4", "F4", "G4", "A4", "B4", "C5"] {
        let number = midi_number(name).ok_or_else(|| anyhow::anyhow!("bad name {name}"))?;
        writeln!(file, "{name}\t{number}\t{:.3}", frequency(number)).map_err(anyhow::Error::from)?;
    }
    std::fs::remove_file(&path).map_err(anyhow::Error::from)?;
    Ok(())
}

fn test_perfect_fifth(_: &mut StateContext) -> CheckResult {
    let span = midi_number("G4").zip(midi_number("C4")).map(|(g, c)| g - c);
    check::equal(span.and_then(interval_name), Some("perfect fifth"))
}

fn test_named_range(_: &mut StateContext) -> CheckResult {
    check::equal(interval_name(0), Some("unison"))?;
    check::equal(interval_name(12), Some("octave"))?;
    check::equal(interval_name(13), None)?;
    check::equal(interval_name(-1), None)
}

const MIDI_NUMBER_DOC: &str = "\
Convert a scientific pitch name to its MIDI note number.

>>> midi_number('C4')
60
>>> midi_number('A4') - midi_number('A3')
12

Flats and sharps spell the same key:

>>> midi_number('Eb4') == midi_number('D#4')
True

Unknown letters are rejected:

>>> midi_number('H2')
Traceback (most recent call last):
  ...
ValueError: invalid pitch name 'H2'
";

const MIDI_NAME_DOC: &str = "\
Sharp-spelled name of a MIDI note number.

>>> midi_name(61)
'C#4'
>>> print(midi_name(0), midi_name(127))
C-1 G9

.. no-run

>>> play(midi_name(60))
";

const FREQUENCY_DOC: &str = "\
Equal-tempered frequency in Hz.

>>> frequency('A4')
440.0
>>> frequency(81) / frequency('A4')
2.0
>>> frequency(57)  # doctest: +SKIP
220.00000000000003
";

const SEMITONES_DOC: &str = "\
Distance between two pitches in semitones.

>>> semitones('C4', 'G4')
7
>>> low = 'E2'
>>> semitones(low, 'E4')
24
>>> semitones('C4', 'C3')
-12
";

const INTERVAL_NAME_DOC: &str = "\
Name of an interval up to an octave.

>>> interval_name(semitones('C4', 'G4'))
'perfect fifth'
>>> interval_name(12)
'octave'

>>> interval_name(13)
Traceback (most recent call last):
  ...
ValueError: no interval name for 13 semitones
";

fn pitch() -> Module {
    Module::new("pitch")
        .environment(pitch_environment())
        .tests(&[
            ("test_middle_c", test_middle_c),
            ("test_enharmonic_spellings", test_enharmonic_spellings),
            ("test_names_round_trip", test_names_round_trip),
            ("test_rejects_bad_names", test_rejects_bad_names),
            ("test_concert_pitch", test_concert_pitch),
        ])
        .slow(&[
            ("test_frequencies_increase", test_frequencies_increase),
            ("test_octave_doubling_everywhere", test_octave_doubling_everywhere),
        ])
        .external(&[("test_write_scale_file", test_write_scale_file)])
        .doc("midi_number", MIDI_NUMBER_DOC)
        .doc("midi_name", MIDI_NAME_DOC)
        .doc("frequency", FREQUENCY_DOC)
}

fn interval() -> Module {
    Module::new("interval")
        .environment(interval_environment())
        .tests(&[
            ("test_perfect_fifth", test_perfect_fifth),
            ("test_named_range", test_named_range),
        ])
        .doc("semitones", SEMITONES_DOC)
        .doc("interval_name", INTERVAL_NAME_DOC)
}

/// Modules of the `sample` suite; every unit passes
pub fn registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry
        .register("pitch", || Ok(pitch()))
        .register("interval", || Ok(interval()));
    registry
}
