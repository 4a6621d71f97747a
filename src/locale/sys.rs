//! Platform access to the process locale and the C library's `strptime`.
use super::{ParseError, ParsedDateTime};

fn no_match(input: &str, format: &str) -> ParseError {
    ParseError::NoMatch {
        input: input.to_string(),
        format: format.to_string(),
    }
}

#[cfg(unix)]
mod imp {
    use super::{ParseError, ParsedDateTime, no_match};

    use std::ffi::{CStr, CString};
    use std::ptr;

    use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

    pub fn query() -> Option<CString> {
        // SAFETY: a null name only reads the current setting. The returned
        // buffer belongs to libc and is copied before anything else can call
        // setlocale and overwrite it.
        unsafe {
            let name = libc::setlocale(libc::LC_ALL, ptr::null());
            if name.is_null() {
                None
            } else {
                Some(CStr::from_ptr(name).to_owned())
            }
        }
    }

    pub fn set(name: &CStr) -> bool {
        // SAFETY: `name` is a valid NUL-terminated string for the whole call.
        !unsafe { libc::setlocale(libc::LC_ALL, name.as_ptr()) }.is_null()
    }

    fn to_datetime(tm: &libc::tm, input: &str) -> Result<NaiveDateTime, ParseError> {
        let out_of_range = || ParseError::OutOfRange(input.to_string());
        let field = |value: libc::c_int| u32::try_from(value).map_err(|_| out_of_range());

        let date = NaiveDate::from_ymd_opt(
            tm.tm_year + 1900,
            field(tm.tm_mon + 1)?,
            field(tm.tm_mday)?,
        )
        .ok_or_else(out_of_range)?;
        let time = NaiveTime::from_hms_opt(field(tm.tm_hour)?, field(tm.tm_min)?, field(tm.tm_sec)?)
            .ok_or_else(out_of_range)?;
        Ok(date.and_time(time))
    }

    // `tm_gmtoff` holds the `%z` offset in seconds east of UTC.
    fn to_offset(tm: &libc::tm, input: &str) -> Result<FixedOffset, ParseError> {
        i32::try_from(tm.tm_gmtoff)
            .ok()
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ParseError::OutOfRange(input.to_string()))
    }

    pub fn strptime(
        input: &str,
        format: &str,
        with_offset: bool,
    ) -> Result<ParsedDateTime, ParseError> {
        let c_input = CString::new(input).map_err(|_| ParseError::InteriorNul)?;
        let c_format = CString::new(format).map_err(|_| ParseError::InteriorNul)?;

        // SAFETY: all-zero is a valid `tm`; a zeroed `tm_zone` is a null pointer.
        let mut tm: libc::tm = unsafe { std::mem::zeroed() };
        tm.tm_mday = 1;

        // SAFETY: both strings are NUL-terminated and outlive the call, and `tm`
        // is a valid, exclusively borrowed struct. The returned pointer points
        // into `c_input`, which is still alive when it is read.
        let rest = unsafe {
            let rest = libc::strptime(c_input.as_ptr(), c_format.as_ptr(), &mut tm);
            if rest.is_null() {
                return Err(no_match(input, format));
            }
            CStr::from_ptr(rest)
        };
        if !rest.to_bytes().is_empty() {
            return Err(ParseError::TrailingInput(rest.to_string_lossy().into_owned()));
        }

        let naive = to_datetime(&tm, input)?;
        if !with_offset {
            return Ok(ParsedDateTime::Naive(naive));
        }
        to_offset(&tm, input)?
            .from_local_datetime(&naive)
            .single()
            .map(ParsedDateTime::Aware)
            .ok_or_else(|| ParseError::OutOfRange(input.to_string()))
    }
}

#[cfg(not(unix))]
mod imp {
    use super::{ParseError, ParsedDateTime, no_match};

    use std::ffi::{CStr, CString};

    use chrono::format::ParseErrorKind;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

    // There is no C locale to switch here.
    pub fn query() -> Option<CString> {
        None
    }

    pub fn set(_name: &CStr) -> bool {
        false
    }

    fn convert(err: chrono::ParseError, input: &str, format: &str) -> ParseError {
        match err.kind() {
            ParseErrorKind::OutOfRange | ParseErrorKind::Impossible => {
                ParseError::OutOfRange(input.to_string())
            }
            ParseErrorKind::TooLong => ParseError::TrailingInput(String::new()),
            _ => no_match(input, format),
        }
    }

    /// chrono only knows the English names, so this matches the C locale.
    pub fn strptime(
        input: &str,
        format: &str,
        with_offset: bool,
    ) -> Result<ParsedDateTime, ParseError> {
        if input.contains('\0') || format.contains('\0') {
            return Err(ParseError::InteriorNul);
        }
        if with_offset {
            return DateTime::parse_from_str(input, format)
                .map(ParsedDateTime::Aware)
                .map_err(|e| convert(e, input, format));
        }
        naive(input, format).map(ParsedDateTime::Naive)
    }

    fn naive(input: &str, format: &str) -> Result<NaiveDateTime, ParseError> {
        let not_enough = |e: &chrono::ParseError| e.kind() == ParseErrorKind::NotEnough;

        let err = match NaiveDateTime::parse_from_str(input, format) {
            Ok(datetime) => return Ok(datetime),
            Err(e) if not_enough(&e) => e,
            Err(e) => return Err(convert(e, input, format)),
        };
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return Ok(date.and_time(NaiveTime::MIN));
        }
        match NaiveTime::parse_from_str(input, format) {
            Ok(time) => NaiveDate::from_ymd_opt(1900, 1, 1)
                .map(|date| date.and_time(time))
                .ok_or_else(|| ParseError::OutOfRange(input.to_string())),
            Err(_) => Err(convert(err, input, format)),
        }
    }
}

pub(super) use imp::{query, set, strptime};
