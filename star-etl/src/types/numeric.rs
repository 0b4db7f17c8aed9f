use bigdecimal::{
    BigDecimal,
    num_bigint::{BigInt, BigUint, Sign},
};
use byteorder::{BigEndian, ReadBytesExt};
use std::{fmt, io::Cursor};
use tokio_postgres::types::{FromSql, Type};

/// Postgres `numeric` value, including the special values a [`BigDecimal`] cannot hold.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Clone)]
pub enum PgNumeric {
    NaN,
    PositiveInf,
    NegativeInf,
    Value(BigDecimal),
}

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(
        _: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + 'static + Sync + Send>> {
        let mut rdr = Cursor::new(raw);

        let n_digits = rdr.read_u16::<BigEndian>()?;
        let weight = rdr.read_i16::<BigEndian>()?;
        let sign = match rdr.read_u16::<BigEndian>()? {
            0x4000 => Sign::Minus,
            0x0000 => Sign::Plus,
            0xC000 => return Ok(PgNumeric::NaN),
            0xD000 => return Ok(PgNumeric::PositiveInf),
            0xF000 => return Ok(PgNumeric::NegativeInf),
            v => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid sign {v:#04x}"),
                )
                .into());
            }
        };
        let scale = rdr.read_u16::<BigEndian>()?;

        let mut biguint = BigUint::from(0u32);
        for n in (0..n_digits).rev() {
            let digit = rdr.read_u16::<BigEndian>()?;
            biguint += BigUint::from(digit) * BigUint::from(10_000u32).pow(n as u32);
        }

        // The first base-10000 digit carries the factor 10_000^weight.
        let correction_exp = 4 * (i64::from(weight) - i64::from(n_digits) + 1);
        let res = BigDecimal::new(BigInt::from_biguint(sign, biguint), -correction_exp)
            .with_scale(i64::from(scale));

        Ok(PgNumeric::Value(res))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(*ty, Type::NUMERIC)
    }
}

impl fmt::Display for PgNumeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PgNumeric::NaN => write!(f, "NaN"),
            PgNumeric::PositiveInf => write!(f, "Infinity"),
            PgNumeric::NegativeInf => write!(f, "-Infinity"),
            PgNumeric::Value(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn encode_header(n_digits: u16, weight: i16, sign: u16, scale: u16, digits: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&n_digits.to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&scale.to_be_bytes());
        for digit in digits {
            raw.extend_from_slice(&digit.to_be_bytes());
        }
        raw
    }

    #[test]
    fn decodes_binary_value() {
        // 12.34 is stored as the base-10000 digits [12, 3400] with weight 0.
        let raw = encode_header(2, 0, 0x0000, 2, &[12, 3400]);

        let value = PgNumeric::from_sql(&Type::NUMERIC, &raw).unwrap();

        assert_eq!(value, PgNumeric::Value(BigDecimal::from_str("12.34").unwrap()));
    }

    #[test]
    fn decodes_negative_large_value() {
        // -123456.7 -> [12, 3456, 7000], weight 1.
        let raw = encode_header(3, 1, 0x4000, 1, &[12, 3456, 7000]);

        let value = PgNumeric::from_sql(&Type::NUMERIC, &raw).unwrap();

        assert_eq!(value.to_string(), "-123456.7");
    }

    #[test]
    fn decodes_special_values() {
        let nan = PgNumeric::from_sql(&Type::NUMERIC, &encode_header(0, 0, 0xC000, 0, &[]));
        let inf = PgNumeric::from_sql(&Type::NUMERIC, &encode_header(0, 0, 0xD000, 0, &[]));

        assert_eq!(nan.unwrap(), PgNumeric::NaN);
        assert_eq!(inf.unwrap(), PgNumeric::PositiveInf);
    }

    #[test]
    fn rejects_unknown_sign() {
        let raw = encode_header(0, 0, 0x1234, 0, &[]);

        assert!(PgNumeric::from_sql(&Type::NUMERIC, &raw).is_err());
    }
}
