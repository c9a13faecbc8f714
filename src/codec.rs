//! Order event wire codec
//!
//! Grammar: `<header>:<symbol_code>.<venue>,<order_id>[,<field>...]` with a
//! fixed positional field list per header. Pure functions, no state or I/O.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::core::error::ProtocolError;
use crate::core::types::{OrderSide, OrderType, Symbol};
use crate::events::{OrderCommand, OrderEvent, OrderEventKind};

/// Decode a raw bus message into a typed lifecycle event.
///
/// Fails without partially constructing an event; the caller discards the
/// message and keeps the session alive.
pub fn decode(raw: &[u8]) -> Result<OrderEvent, ProtocolError> {
    let text = std::str::from_utf8(raw).map_err(|_| ProtocolError::InvalidUtf8)?;

    let (header, body) = text
        .split_once(':')
        .ok_or(ProtocolError::Malformed("missing header separator"))?;

    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() < 2 {
        return Err(ProtocolError::Malformed("missing symbol or order id"));
    }

    let symbol = parse_symbol(fields[0])?;
    let order_id = fields[1].to_string();

    let (kind, venue_ts) = match header {
        "order_submitted" => {
            expect_fields("order_submitted", &fields, 3)?;
            (OrderEventKind::Submitted, parse_timestamp(fields[2])?)
        }
        "order_accepted" => {
            expect_fields("order_accepted", &fields, 3)?;
            (OrderEventKind::Accepted, parse_timestamp(fields[2])?)
        }
        "order_rejected" => {
            expect_fields("order_rejected", &fields, 4)?;
            (
                OrderEventKind::Rejected {
                    reason: fields[3].to_string(),
                },
                parse_timestamp(fields[2])?,
            )
        }
        "order_working" => {
            expect_fields("order_working", &fields, 4)?;
            (
                OrderEventKind::Working {
                    broker_order_id: fields[2].to_string(),
                },
                parse_timestamp(fields[3])?,
            )
        }
        "order_cancelled" => {
            expect_fields("order_cancelled", &fields, 3)?;
            (OrderEventKind::Cancelled, parse_timestamp(fields[2])?)
        }
        "order_cancel_reject" => {
            expect_fields("order_cancel_reject", &fields, 4)?;
            (
                OrderEventKind::CancelReject {
                    reason: fields[3].to_string(),
                },
                parse_timestamp(fields[2])?,
            )
        }
        "order_modified" => {
            expect_fields("order_modified", &fields, 5)?;
            (
                OrderEventKind::Modified {
                    broker_order_id: fields[2].to_string(),
                    new_price: parse_decimal("new price", fields[3])?,
                },
                parse_timestamp(fields[4])?,
            )
        }
        "order_expired" => {
            expect_fields("order_expired", &fields, 3)?;
            (OrderEventKind::Expired, parse_timestamp(fields[2])?)
        }
        "order_filled" => {
            expect_fields("order_filled", &fields, 8)?;
            (
                OrderEventKind::Filled {
                    broker_order_id: fields[2].to_string(),
                    execution_id: fields[3].to_string(),
                    side: OrderSide::from_str(fields[4])?,
                    filled_quantity: parse_quantity("filled quantity", fields[5])?,
                    average_price: parse_decimal("average price", fields[6])?,
                },
                parse_timestamp(fields[7])?,
            )
        }
        "order_partially_filled" => {
            expect_fields("order_partially_filled", &fields, 9)?;
            (
                OrderEventKind::PartiallyFilled {
                    broker_order_id: fields[2].to_string(),
                    execution_id: fields[3].to_string(),
                    side: OrderSide::from_str(fields[4])?,
                    filled_quantity: parse_quantity("filled quantity", fields[5])?,
                    leaves_quantity: parse_quantity("remaining quantity", fields[6])?,
                    average_price: parse_decimal("average price", fields[7])?,
                },
                parse_timestamp(fields[8])?,
            )
        }
        unknown => return Err(ProtocolError::UnknownHeader(unknown.to_string())),
    };

    Ok(OrderEvent::new(symbol, order_id, venue_ts, kind))
}

/// Encode a lifecycle event back onto the wire. Only wire-carried fields are
/// written; the local event id and receipt timestamp are not.
pub fn encode_event(event: &OrderEvent) -> String {
    let prefix = format!(
        "{}:{},{}",
        event.kind.header(),
        event.symbol,
        event.order_id
    );
    let ts = format_timestamp(event.venue_ts);

    match &event.kind {
        OrderEventKind::Submitted
        | OrderEventKind::Accepted
        | OrderEventKind::Cancelled
        | OrderEventKind::Expired => format!("{prefix},{ts}"),
        OrderEventKind::Rejected { reason } | OrderEventKind::CancelReject { reason } => {
            format!("{prefix},{ts},{reason}")
        }
        OrderEventKind::Working { broker_order_id } => {
            format!("{prefix},{broker_order_id},{ts}")
        }
        OrderEventKind::Modified {
            broker_order_id,
            new_price,
        } => format!("{prefix},{broker_order_id},{new_price},{ts}"),
        OrderEventKind::Filled {
            broker_order_id,
            execution_id,
            side,
            filled_quantity,
            average_price,
        } => format!(
            "{prefix},{broker_order_id},{execution_id},{side},{filled_quantity},{average_price},{ts}"
        ),
        OrderEventKind::PartiallyFilled {
            broker_order_id,
            execution_id,
            side,
            filled_quantity,
            leaves_quantity,
            average_price,
        } => format!(
            "{prefix},{broker_order_id},{execution_id},{side},{filled_quantity},{leaves_quantity},{average_price},{ts}"
        ),
    }
}

/// Encode an outbound command in the symmetric grammar.
pub fn encode_command(command: &OrderCommand) -> String {
    match command {
        OrderCommand::Submit { order } => {
            let ts = format_timestamp(order.timestamp);
            match (order.order_type, order.price) {
                (OrderType::Market, _) | (_, None) => format!(
                    "submit_order:{},{},{},{},{},{ts}",
                    order.symbol, order.id, order.side, order.order_type, order.quantity
                ),
                (_, Some(price)) => format!(
                    "submit_order:{},{},{},{},{},{price},{ts}",
                    order.symbol, order.id, order.side, order.order_type, order.quantity
                ),
            }
        }
        OrderCommand::Cancel {
            symbol,
            order_id,
            timestamp,
        } => format!(
            "cancel_order:{symbol},{order_id},{}",
            format_timestamp(*timestamp)
        ),
        OrderCommand::Modify {
            symbol,
            order_id,
            new_price,
            timestamp,
        } => format!(
            "modify_order:{symbol},{order_id},{new_price},{}",
            format_timestamp(*timestamp)
        ),
    }
}

fn parse_symbol(field: &str) -> Result<Symbol, ProtocolError> {
    let (code, venue) = field
        .split_once('.')
        .ok_or(ProtocolError::Malformed("missing symbol venue separator"))?;
    if code.is_empty() {
        return Err(ProtocolError::Malformed("empty symbol code"));
    }
    Ok(Symbol::new(code, venue.parse()?))
}

fn parse_timestamp(field: &str) -> Result<DateTime<Utc>, ProtocolError> {
    DateTime::parse_from_rfc3339(field)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ProtocolError::InvalidTimestamp(field.to_string()))
}

fn parse_decimal(what: &'static str, field: &str) -> Result<Decimal, ProtocolError> {
    Decimal::from_str(field).map_err(|_| ProtocolError::InvalidNumber {
        what,
        value: field.to_string(),
    })
}

fn parse_quantity(what: &'static str, field: &str) -> Result<u64, ProtocolError> {
    field.parse::<u64>().map_err(|_| ProtocolError::InvalidNumber {
        what,
        value: field.to_string(),
    })
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn expect_fields(
    header: &'static str,
    fields: &[&str],
    expected: usize,
) -> Result<(), ProtocolError> {
    if fields.len() != expected {
        return Err(ProtocolError::FieldCount {
            header,
            expected,
            actual: fields.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Order, Venue};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_decode_filled() {
        let event = decode(
            b"order_filled:EURUSD.FXCM,O-123,B-99,E-1,buy,100000,1.10050,2020-01-01T00:00:00Z",
        )
        .unwrap();

        assert_eq!(event.symbol, Symbol::new("EURUSD", Venue::Fxcm));
        assert_eq!(event.order_id, "O-123");
        assert_eq!(event.venue_ts, ts());
        assert_eq!(
            event.kind,
            OrderEventKind::Filled {
                broker_order_id: "B-99".to_string(),
                execution_id: "E-1".to_string(),
                side: OrderSide::Buy,
                filled_quantity: 100_000,
                average_price: dec!(1.10050),
            }
        );

        // Exact decimal, not a float approximation: the scale survives.
        if let OrderEventKind::Filled { average_price, .. } = event.kind {
            assert_eq!(average_price.to_string(), "1.10050");
        }
    }

    #[test]
    fn test_decode_partially_filled() {
        let event = decode(
            b"order_partially_filled:AUDUSD.FXCM,O-7,B-1,E-2,SELL,50000,25000,0.80010,2020-01-01T00:00:00Z",
        )
        .unwrap();

        assert_eq!(
            event.kind,
            OrderEventKind::PartiallyFilled {
                broker_order_id: "B-1".to_string(),
                execution_id: "E-2".to_string(),
                side: OrderSide::Sell,
                filled_quantity: 50_000,
                leaves_quantity: 25_000,
                average_price: dec!(0.80010),
            }
        );
    }

    #[test]
    fn test_decode_rejected_keeps_reason_text() {
        let event = decode(
            b"order_rejected:EURUSD.FXCM,O-999,2020-01-01T00:00:00Z,insufficient margin",
        )
        .unwrap();

        assert_eq!(event.order_id, "O-999");
        assert_eq!(
            event.kind,
            OrderEventKind::Rejected {
                reason: "insufficient margin".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_working_and_modified() {
        let working =
            decode(b"order_working:GBPUSD.DUKASCOPY,O-5,B-42,2020-01-01T00:00:00Z").unwrap();
        assert_eq!(
            working.kind,
            OrderEventKind::Working {
                broker_order_id: "B-42".to_string(),
            }
        );

        let modified =
            decode(b"order_modified:GBPUSD.DUKASCOPY,O-5,B-42,1.30500,2020-01-01T00:00:00Z")
                .unwrap();
        assert_eq!(
            modified.kind,
            OrderEventKind::Modified {
                broker_order_id: "B-42".to_string(),
                new_price: dec!(1.30500),
            }
        );
    }

    #[test]
    fn test_decode_bare_variants() {
        for (raw, kind) in [
            (
                "order_submitted:EURUSD.FXCM,O-1,2020-01-01T00:00:00Z",
                OrderEventKind::Submitted,
            ),
            (
                "order_accepted:EURUSD.FXCM,O-1,2020-01-01T00:00:00Z",
                OrderEventKind::Accepted,
            ),
            (
                "order_cancelled:EURUSD.FXCM,O-1,2020-01-01T00:00:00Z",
                OrderEventKind::Cancelled,
            ),
            (
                "order_expired:EURUSD.FXCM,O-1,2020-01-01T00:00:00Z",
                OrderEventKind::Expired,
            ),
        ] {
            let event = decode(raw.as_bytes()).unwrap();
            assert_eq!(event.kind, kind, "for {raw}");
            assert_eq!(event.venue_ts, ts());
        }
    }

    #[test]
    fn test_decode_unknown_header() {
        let err = decode(b"order_xyz:EURUSD.FXCM,O-1").unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownHeader(h) if h == "order_xyz"));
    }

    #[test]
    fn test_decode_wrong_field_count() {
        let err = decode(b"order_filled:EURUSD.FXCM,O-1,B-1,E-1,buy,100,2020-01-01T00:00:00Z")
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::FieldCount {
                header: "order_filled",
                expected: 8,
                actual: 7,
            }
        ));
    }

    #[test]
    fn test_decode_bad_tokens() {
        assert!(matches!(
            decode(b"order_filled:EURUSD.FXCM,O-1,B-1,E-1,hold,100,1.1,2020-01-01T00:00:00Z"),
            Err(ProtocolError::InvalidToken { what: "order side", .. })
        ));
        assert!(matches!(
            decode(b"order_submitted:EURUSD.NYSE,O-1,2020-01-01T00:00:00Z"),
            Err(ProtocolError::InvalidToken { what: "venue", .. })
        ));
        assert!(matches!(
            decode(b"order_filled:EURUSD.FXCM,O-1,B-1,E-1,buy,-100,1.1,2020-01-01T00:00:00Z"),
            Err(ProtocolError::InvalidNumber { what: "filled quantity", .. })
        ));
        assert!(matches!(
            decode(b"order_modified:EURUSD.FXCM,O-1,B-1,one,2020-01-01T00:00:00Z"),
            Err(ProtocolError::InvalidNumber { what: "new price", .. })
        ));
        assert!(matches!(
            decode(b"order_expired:EURUSD.FXCM,O-1,yesterday"),
            Err(ProtocolError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            decode(b"order_submitted"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_event_round_trip() {
        let symbol = Symbol::new("EURUSD", Venue::Fxcm);
        let kinds = vec![
            OrderEventKind::Submitted,
            OrderEventKind::Rejected {
                reason: "insufficient margin".to_string(),
            },
            OrderEventKind::Working {
                broker_order_id: "B-9".to_string(),
            },
            OrderEventKind::Modified {
                broker_order_id: "B-9".to_string(),
                new_price: dec!(1.23450),
            },
            OrderEventKind::Filled {
                broker_order_id: "B-9".to_string(),
                execution_id: "E-3".to_string(),
                side: OrderSide::Buy,
                filled_quantity: 100_000,
                average_price: dec!(1.10050),
            },
            OrderEventKind::PartiallyFilled {
                broker_order_id: "B-9".to_string(),
                execution_id: "E-4".to_string(),
                side: OrderSide::Sell,
                filled_quantity: 60_000,
                leaves_quantity: 40_000,
                average_price: dec!(1.10000),
            },
        ];

        for kind in kinds {
            let original = OrderEvent::new(symbol.clone(), "O-55", ts(), kind);
            let decoded = decode(encode_event(&original).as_bytes()).unwrap();

            assert_eq!(decoded.symbol, original.symbol);
            assert_eq!(decoded.order_id, original.order_id);
            assert_eq!(decoded.venue_ts, original.venue_ts);
            assert_eq!(decoded.kind, original.kind);
            // Locally assigned identity is fresh on every decode.
            assert_ne!(decoded.event_id, original.event_id);
        }
    }

    #[test]
    fn test_encode_commands() {
        let symbol = Symbol::new("EURUSD", Venue::Fxcm);

        let mut order = Order::limit("O-10", symbol.clone(), OrderSide::Buy, 100_000, dec!(1.0990));
        order.timestamp = ts();
        assert_eq!(
            encode_command(&OrderCommand::Submit { order }),
            "submit_order:EURUSD.FXCM,O-10,BUY,LIMIT,100000,1.0990,2020-01-01T00:00:00Z"
        );

        let mut market = Order::market("O-11", symbol.clone(), OrderSide::Sell, 50_000);
        market.timestamp = ts();
        assert_eq!(
            encode_command(&OrderCommand::Submit { order: market }),
            "submit_order:EURUSD.FXCM,O-11,SELL,MARKET,50000,2020-01-01T00:00:00Z"
        );

        assert_eq!(
            encode_command(&OrderCommand::Cancel {
                symbol: symbol.clone(),
                order_id: "O-10".to_string(),
                timestamp: ts(),
            }),
            "cancel_order:EURUSD.FXCM,O-10,2020-01-01T00:00:00Z"
        );

        assert_eq!(
            encode_command(&OrderCommand::Modify {
                symbol,
                order_id: "O-10".to_string(),
                new_price: dec!(1.1000),
                timestamp: ts(),
            }),
            "modify_order:EURUSD.FXCM,O-10,1.1000,2020-01-01T00:00:00Z"
        );
    }
}
