//! Test utilities for format round-trip testing
//!
//! Shared helpers over [`BinaryFormat`] so that format tests do not repeat
//! the build/parse/compare sequence.

use crate::BinaryFormat;
use std::fmt::Debug;

/// Build `original`, parse the bytes back and compare
pub fn test_round_trip<T>(original: &T) -> Result<(), Box<dyn std::error::Error>>
where
    T: BinaryFormat + PartialEq + Debug,
{
    let data = original.build()?;
    let parsed = T::parse(&data)?;

    if original != &parsed {
        return Err(format!(
            "Round-trip verification failed:\nOriginal: {:?}\nParsed: {:?}",
            original, parsed
        )
        .into());
    }

    Ok(())
}

/// Parse `data`, rebuild, parse again and compare the two parsed values
pub fn test_round_trip_with_data<T>(data: &[u8]) -> Result<(), Box<dyn std::error::Error>>
where
    T: BinaryFormat + PartialEq + Debug,
{
    let parsed = T::parse(data)?;
    let rebuilt = parsed.build()?;
    let reparsed = T::parse(&rebuilt)?;

    if parsed != reparsed {
        return Err(format!(
            "Round-trip with data failed:\nParsed: {:?}\nReparsed: {:?}",
            parsed, reparsed
        )
        .into());
    }

    Ok(())
}

/// Succeeds only if parsing `invalid_data` fails
pub fn test_invalid_data_rejected<T>(invalid_data: &[u8]) -> Result<(), Box<dyn std::error::Error>>
where
    T: BinaryFormat,
{
    match T::parse(invalid_data) {
        Ok(_) => Err("Expected parsing to fail for invalid data, but it succeeded".into()),
        Err(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One tick offset, as stored at the start of every record
    #[derive(Debug, PartialEq)]
    struct Tick(i32);

    impl BinaryFormat for Tick {
        fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
            let bytes: [u8; 4] = data.try_into()?;
            Ok(Tick(i32::from_le_bytes(bytes)))
        }

        fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
            Ok(self.0.to_le_bytes().to_vec())
        }
    }

    #[test]
    fn test_round_trip_utility() {
        test_round_trip(&Tick(-365)).expect("Round-trip should succeed");
        Tick::verify_round_trip(&7i32.to_le_bytes()).expect("Bytes should survive");
    }

    #[test]
    fn test_round_trip_with_data_utility() {
        test_round_trip_with_data::<Tick>(&42i32.to_le_bytes())
            .expect("Round-trip with data should succeed");
    }

    #[test]
    fn test_invalid_data_rejected_utility() {
        test_invalid_data_rejected::<Tick>(&[1, 2]).expect("Should reject invalid data");
        assert!(test_invalid_data_rejected::<Tick>(&[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn test_round_trip_failure_detection() {
        // Parses anything, builds nothing
        #[derive(Debug, PartialEq)]
        struct Unbuildable;

        impl BinaryFormat for Unbuildable {
            fn parse(_: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
                Ok(Unbuildable)
            }

            fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
                Err("Always fails".into())
            }
        }

        assert!(test_round_trip(&Unbuildable).is_err());
    }
}
