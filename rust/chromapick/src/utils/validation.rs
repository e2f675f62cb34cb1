use crate::errors::InputValidationError;

pub fn check_same_length<A, B>(
    a: &[A],
    b: &[B],
    context: &str,
) -> Result<(), InputValidationError> {
    if a.len() != b.len() {
        return Err(InputValidationError::ExpectedSlicesSameLength {
            expected: a.len(),
            other: b.len(),
            context: context.to_string(),
        });
    }
    Ok(())
}

pub fn check_finite(values: &[f64], context: &str) -> Result<(), InputValidationError> {
    match values.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(InputValidationError::ExpectedFiniteData {
            index,
            value: values[index],
            context: context.to_string(),
        }),
        None => Ok(()),
    }
}

pub fn check_min_len(
    values: &[f64],
    required: usize,
    context: &str,
) -> Result<(), InputValidationError> {
    if values.is_empty() {
        return Err(InputValidationError::ExpectedNonEmptyData {
            context: context.to_string(),
        });
    }
    if values.len() < required {
        return Err(InputValidationError::TooFewPoints {
            required,
            found: values.len(),
            context: context.to_string(),
        });
    }
    Ok(())
}
