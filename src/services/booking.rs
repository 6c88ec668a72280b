use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::db::queries;
use crate::errors::BookingError;
use crate::models::{
    Booking, BookingReceipt, BookingRequest, CancellationReceipt, NewBooking, StayDates,
    TransactionKind,
};
use crate::services::clock::Clock;
use crate::services::inventory;
use crate::services::points::{self, TransactionRecord, LKR_PER_POINT, POINTS_PER_BOOKING_DAY};

pub const CANCELLATION_WINDOW_HOURS: i64 = 3;
pub const MAX_STAY_NIGHTS: i64 = 366;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Reserving,
    Redeeming,
    Persisting,
    Earning,
    CommittingInventory,
    Committed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validating => "validating",
            Stage::Reserving => "reserving",
            Stage::Redeeming => "redeeming",
            Stage::Persisting => "persisting",
            Stage::Earning => "earning",
            Stage::CommittingInventory => "committing_inventory",
            Stage::Committed => "committed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    Redeemed { points: i64 },
    Earned { points: i64, booking_id: i64 },
}

struct CreateAttempt<'a> {
    request: &'a BookingRequest,
    stay: StayDates,
    now: DateTime<Utc>,
    stage: Stage,
    effects: Vec<Effect>,
}

pub fn create_booking(
    conn: &mut Connection,
    clock: &dyn Clock,
    request: &BookingRequest,
) -> Result<BookingReceipt, BookingError> {
    let stay = validate(request)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut attempt = CreateAttempt {
        request,
        stay,
        now: clock.now(),
        stage: Stage::Validating,
        effects: Vec::new(),
    };

    match attempt.run(&tx) {
        Ok(receipt) => {
            tx.commit()?;
            attempt.stage = Stage::Committed;
            tracing::info!(
                booking_id = receipt.booking_id,
                listing_id = request.listing_id,
                customer_id = request.customer_id,
                nights = stay.nights(),
                points_earned = receipt.points_earned,
                points_redeemed = receipt.points_redeemed,
                "booking committed"
            );
            Ok(receipt)
        }
        Err(err) => {
            attempt.abort(tx, &err);
            Err(err)
        }
    }
}

fn validate(request: &BookingRequest) -> Result<StayDates, BookingError> {
    if request.listing_id <= 0 {
        return Err(BookingError::InvalidRequest(
            "listing_id must be positive".to_string(),
        ));
    }
    if request.customer_id <= 0 {
        return Err(BookingError::InvalidRequest(
            "customer_id must be positive".to_string(),
        ));
    }
    if request.redeem_points < 0 {
        return Err(BookingError::InvalidRequest(
            "redeem_points must not be negative".to_string(),
        ));
    }
    let stay = StayDates::parse(&request.check_in, &request.check_out)
        .map_err(BookingError::InvalidRequest)?;
    if stay.nights() > MAX_STAY_NIGHTS {
        return Err(BookingError::InvalidRequest(format!(
            "a stay may not exceed {MAX_STAY_NIGHTS} nights"
        )));
    }
    Ok(stay)
}

impl CreateAttempt<'_> {
    fn run(&mut self, conn: &Connection) -> Result<BookingReceipt, BookingError> {
        let listing_id = self.request.listing_id;
        let customer_id = self.request.customer_id;

        queries::get_approved_listing(conn, listing_id)?
            .ok_or_else(|| BookingError::NotFound(format!("listing {listing_id}")))?;

        self.stage = Stage::Reserving;
        if let Some(date) = inventory::first_unavailable_date(conn, listing_id, &self.stay)? {
            return Err(BookingError::NoAvailability { date });
        }

        let points_redeemed = self.request.redeem_points;
        let mut redemption_amount = 0;
        if points_redeemed > 0 {
            self.stage = Stage::Redeeming;
            let balance = points::get_balance(conn, customer_id)?;
            if points_redeemed > balance {
                return Err(BookingError::InsufficientPoints {
                    requested: points_redeemed,
                    balance,
                });
            }
            points::adjust_balance(conn, customer_id, -points_redeemed)?;
            self.effects.push(Effect::Redeemed {
                points: points_redeemed,
            });
            let description = format!("Redeemed {points_redeemed} points on listing {listing_id}");
            points::record_transaction(
                conn,
                &TransactionRecord {
                    user_id: customer_id,
                    points: points_redeemed,
                    kind: TransactionKind::Redeem,
                    reverts: None,
                    booking_id: None,
                    description: Some(&description),
                    created_at: self.now,
                },
            )?;
            redemption_amount = points_redeemed * LKR_PER_POINT;
        }

        self.stage = Stage::Persisting;
        let points_earned = self.stay.nights() * POINTS_PER_BOOKING_DAY;
        let booking_id = queries::insert_booking(
            conn,
            &NewBooking {
                listing_id,
                customer_id,
                stay: self.stay,
                created_at: self.now.naive_utc(),
                points_earned,
                points_redeemed,
                redemption_amount,
            },
        )?;

        if points_earned > 0 {
            self.stage = Stage::Earning;
            points::adjust_balance(conn, customer_id, points_earned)?;
            self.effects.push(Effect::Earned {
                points: points_earned,
                booking_id,
            });
            let description = format!("Earned for booking {booking_id}");
            points::record_transaction(
                conn,
                &TransactionRecord {
                    user_id: customer_id,
                    points: points_earned,
                    kind: TransactionKind::Earn,
                    reverts: None,
                    booking_id: Some(booking_id),
                    description: Some(&description),
                    created_at: self.now,
                },
            )?;
        }

        self.stage = Stage::CommittingInventory;
        inventory::reserve(conn, listing_id, &self.stay)?;

        Ok(BookingReceipt {
            booking_id,
            points_earned,
            points_redeemed,
            redemption_amount,
        })
    }

    // Compensation errors are logged and never replace `cause`.
    fn abort(self, tx: Transaction<'_>, cause: &BookingError) {
        if self.effects.is_empty() {
            tracing::info!(
                stage = self.stage.as_str(),
                listing_id = self.request.listing_id,
                customer_id = self.request.customer_id,
                reason = %cause,
                "booking rejected"
            );
        } else if tx.is_autocommit() {
            // SQLite already rolled the transaction back; nothing left to undo.
            tracing::warn!(
                stage = self.stage.as_str(),
                error = %cause,
                "booking failed after storage rolled back"
            );
        } else {
            tracing::warn!(
                stage = self.stage.as_str(),
                customer_id = self.request.customer_id,
                error = %cause,
                "booking failed, compensating"
            );
            for effect in self.effects.iter().rev() {
                if let Err(e) = self.compensate(&tx, *effect) {
                    tracing::error!(error = %e, effect = ?effect, "compensation failed");
                }
            }
        }

        if let Err(e) = tx.rollback() {
            tracing::error!(error = %e, "rollback of failed booking failed");
        }
    }

    fn compensate(&self, conn: &Connection, effect: Effect) -> rusqlite::Result<()> {
        let customer_id = self.request.customer_id;
        match effect {
            Effect::Redeemed { points } => {
                points::adjust_balance(conn, customer_id, points)?;
                points::record_transaction(
                    conn,
                    &TransactionRecord {
                        user_id: customer_id,
                        points,
                        kind: TransactionKind::Revert,
                        reverts: Some(TransactionKind::Redeem),
                        booking_id: None,
                        description: Some("Restored after failed booking"),
                        created_at: self.now,
                    },
                )?;
            }
            Effect::Earned { points, booking_id } => {
                let applied = debit(conn, customer_id, points)?;
                points::record_transaction(
                    conn,
                    &TransactionRecord {
                        user_id: customer_id,
                        points: applied,
                        kind: TransactionKind::Revert,
                        reverts: Some(TransactionKind::Earn),
                        booking_id: Some(booking_id),
                        description: Some("Withdrawn after failed booking"),
                        created_at: self.now,
                    },
                )?;
            }
        }
        Ok(())
    }
}

fn debit(conn: &Connection, user_id: i64, points: i64) -> rusqlite::Result<i64> {
    let before = points::get_balance(conn, user_id)?;
    let after = points::adjust_balance(conn, user_id, -points)?;
    Ok(before - after)
}

pub fn cancel_booking(
    conn: &mut Connection,
    clock: &dyn Clock,
    booking_id: i64,
) -> Result<CancellationReceipt, BookingError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let booking = queries::get_booking(&tx, booking_id)?
        .ok_or_else(|| BookingError::NotFound(format!("booking {booking_id}")))?;
    if booking.is_cancelled {
        return Err(BookingError::AlreadyCancelled(booking_id));
    }
    if booking.is_completed {
        return Err(BookingError::InvalidRequest(format!(
            "booking {booking_id} is already completed"
        )));
    }

    let now = clock.now();
    if now - booking.created_at_utc() > Duration::hours(CANCELLATION_WINDOW_HOURS) {
        return Err(BookingError::WindowExpired {
            hours: CANCELLATION_WINDOW_HOURS,
        });
    }

    let receipt = reverse(&tx, &booking, now)?;
    tx.commit()?;

    tracing::info!(
        booking_id,
        listing_id = booking.listing_id,
        customer_id = booking.customer_id,
        points_reverted = receipt.points_reverted,
        points_restored = receipt.points_restored,
        "booking cancelled"
    );
    Ok(receipt)
}

fn reverse(
    conn: &Connection,
    booking: &Booking,
    now: DateTime<Utc>,
) -> Result<CancellationReceipt, BookingError> {
    if !queries::mark_booking_cancelled(conn, booking.id)? {
        return Err(BookingError::AlreadyCancelled(booking.id));
    }

    let stay = booking.stay();
    inventory::release(conn, booking.listing_id, &stay)?;

    let mut points_reverted = 0;
    if booking.points_earned > 0 {
        points_reverted = debit(conn, booking.customer_id, booking.points_earned)?;
        let description = format!("Reverted earn for cancelled booking {}", booking.id);
        points::record_transaction(
            conn,
            &TransactionRecord {
                user_id: booking.customer_id,
                points: points_reverted,
                kind: TransactionKind::Revert,
                reverts: Some(TransactionKind::Earn),
                booking_id: Some(booking.id),
                description: Some(&description),
                created_at: now,
            },
        )?;
    }

    let mut points_restored = 0;
    if booking.points_redeemed > 0 {
        points::adjust_balance(conn, booking.customer_id, booking.points_redeemed)?;
        points_restored = booking.points_redeemed;
        let description = format!("Restored redemption for cancelled booking {}", booking.id);
        points::record_transaction(
            conn,
            &TransactionRecord {
                user_id: booking.customer_id,
                points: points_restored,
                kind: TransactionKind::Revert,
                reverts: Some(TransactionKind::Redeem),
                booking_id: Some(booking.id),
                description: Some(&description),
                created_at: now,
            },
        )?;
    }

    Ok(CancellationReceipt {
        booking_id: booking.id,
        nights_released: stay.nights(),
        points_reverted,
        points_restored,
    })
}
