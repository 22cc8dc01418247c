use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::debug;

use crate::clock::Clock;
use crate::growth::calculate_period_growth;
use crate::models::{
    ActivityEntry, ApprovalSegment, DashboardView, DayBucket, Diagnostics, ListingRecord,
    ListingStats, ListingStatus, NewUsersPoint, Snapshot, UserRecord, UserStatus, WeekRange,
    WeeklyListingsPoint,
};
use crate::period::Timestamped;

pub const GROWTH_PERIOD_DAYS: i64 = 7;
pub const RECENT_ACTIVITY_LIMIT: usize = 5;
pub const WEEKS_PER_MONTH: u32 = 4;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

const GREEN: &str = "#10B981";
const BLUE: &str = "#3B82F6";
const AMBER: &str = "#F59E0B";
const PURPLE: &str = "#8B5CF6";

/// Builds the full admin dashboard from one snapshot, reading the clock once.
pub fn build_dashboard(snapshot: &Snapshot, clock: &dyn Clock) -> DashboardView {
    let now = clock.now();
    let mut diagnostics = Diagnostics::default();

    let user_growth = calculate_period_growth(
        &snapshot.users,
        GROWTH_PERIOD_DAYS,
        None::<fn(&UserRecord) -> bool>,
        now,
    );
    let listing_growth = calculate_period_growth(
        &snapshot.listings,
        GROWTH_PERIOD_DAYS,
        Some(is_approved),
        now,
    );
    let active_count = snapshot.listings.iter().filter(|l| is_approved(l)).count() as u32;

    let new_users_data = new_users_by_day(&snapshot.users, now, &mut diagnostics)
        .into_iter()
        .map(|bucket| NewUsersPoint {
            day: bucket.day_name,
            users: bucket.count,
        })
        .collect();
    let business_listings_data = listings_by_week(&snapshot.listings, now, &mut diagnostics);
    let recent_activity =
        recent_activity(&snapshot.users, &snapshot.listings, now, &mut diagnostics);

    debug!(
        users = snapshot.users.len(),
        listings = snapshot.listings.len(),
        skipped = diagnostics.skipped.len(),
        "dashboard aggregated"
    );

    DashboardView {
        generated_at: now,
        total_users: snapshot.users.len(),
        user_growth,
        listing_stats: ListingStats {
            growth: listing_growth,
            active_count,
        },
        new_users_data,
        user_approval_data: user_approval_breakdown(&snapshot.users),
        business_listings_data,
        recent_activity,
        diagnostics,
    }
}

fn is_approved(listing: &ListingRecord) -> bool {
    listing.listing_status == ListingStatus::Approved
}

/// One bucket per calendar day from six days ago through today.
pub fn new_users_by_day(
    users: &[UserRecord],
    now: DateTime<Utc>,
    diagnostics: &mut Diagnostics,
) -> Vec<DayBucket> {
    let today = now.date_naive();
    let mut buckets: Vec<DayBucket> = (0..7)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let day_of_week = date.weekday().num_days_from_sunday();
            DayBucket {
                date,
                day_of_week,
                day_name: DAY_NAMES[day_of_week as usize],
                count: 0,
            }
        })
        .collect();

    for user in users {
        let Some(created) = user.resolve_or_skip(diagnostics) else {
            continue;
        };
        let day = created.date_naive();
        if let Some(bucket) = buckets.iter_mut().find(|bucket| bucket.date == day) {
            bucket.count += 1;
        }
    }

    buckets
}

pub fn user_approval_breakdown(users: &[UserRecord]) -> Vec<ApprovalSegment> {
    let mut active = 0;
    let mut pending = 0;

    for user in users {
        match user.user_status {
            UserStatus::Active => active += 1,
            UserStatus::Pending => pending += 1,
            UserStatus::Rejected | UserStatus::Unrecognized(_) => {}
        }
    }

    vec![
        ApprovalSegment {
            name: "Approved",
            value: active,
            color: GREEN,
        },
        ApprovalSegment {
            name: "Pending",
            value: pending,
            color: AMBER,
        },
    ]
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

fn days_per_week(days_in_month: u32) -> u32 {
    days_in_month.div_ceil(WEEKS_PER_MONTH)
}

/// Splits the month containing `day` into four ranges of
/// `ceil(days_in_month / 4)` days; the last range ends on the month's last day.
pub fn week_ranges(day: NaiveDate) -> Vec<WeekRange> {
    let month_start = day - Duration::days(i64::from(day.day0()));
    let total_days = days_in_month(day.year(), day.month());
    let chunk = days_per_week(total_days);

    (0..WEEKS_PER_MONTH)
        .map(|index| {
            let first = index * chunk;
            let last = ((index + 1) * chunk).min(total_days) - 1;
            WeekRange {
                start: month_start + Duration::days(i64::from(first)),
                end: month_start + Duration::days(i64::from(last)),
                label: format!("Week {}", index + 1),
                week_number: index + 1,
            }
        })
        .collect()
}

/// Week number of a day of the month, using the same partition as [`week_ranges`].
pub fn week_of_month(day_of_month: u32, days_in_month: u32) -> u32 {
    ((day_of_month.max(1) - 1) / days_per_week(days_in_month) + 1).min(WEEKS_PER_MONTH)
}

/// Approved and pending listings created this month, per week of the month.
pub fn listings_by_week(
    listings: &[ListingRecord],
    now: DateTime<Utc>,
    diagnostics: &mut Diagnostics,
) -> Vec<WeeklyListingsPoint> {
    let today = now.date_naive();
    let total_days = days_in_month(today.year(), today.month());
    let mut points: Vec<WeeklyListingsPoint> = week_ranges(today)
        .into_iter()
        .map(|range| WeeklyListingsPoint {
            week: range.label,
            active: 0,
            waiting_approval: 0,
        })
        .collect();

    for listing in listings {
        let Some(created) = listing.resolve_or_skip(diagnostics) else {
            continue;
        };
        let date = created.date_naive();
        if date.year() != today.year() || date.month() != today.month() {
            continue;
        }

        let index = (week_of_month(date.day(), total_days) - 1) as usize;
        let Some(point) = points.get_mut(index) else {
            continue;
        };
        match listing.listing_status {
            ListingStatus::Approved => point.active += 1,
            ListingStatus::Pending => point.waiting_approval += 1,
            ListingStatus::Rejected | ListingStatus::Unrecognized(_) => {}
        }
    }

    points
}

/// The newest user registrations and listing events, most recent first.
pub fn recent_activity(
    users: &[UserRecord],
    listings: &[ListingRecord],
    now: DateTime<Utc>,
    diagnostics: &mut Diagnostics,
) -> Vec<ActivityEntry> {
    let mut entries = Vec::with_capacity(users.len() + listings.len());

    for user in users {
        let Some(date) = user.resolve_or_skip(diagnostics) else {
            continue;
        };
        entries.push(ActivityEntry {
            id: format!("user-{}", user.id),
            text: format!("New user registered: {}", user.full_name),
            time: format_time_ago(date, now),
            color: GREEN,
            date,
        });
    }

    for listing in listings {
        let Some(date) = listing.resolve_or_skip(diagnostics) else {
            continue;
        };
        let (text, color) = match listing.listing_status {
            ListingStatus::Approved => (format!("Business listing approved: {}", listing.title), BLUE),
            ListingStatus::Pending => (
                format!("New business listing submitted: {}", listing.title),
                AMBER,
            ),
            ListingStatus::Rejected | ListingStatus::Unrecognized(_) => {
                (format!("Business listing updated: {}", listing.title), PURPLE)
            }
        };
        entries.push(ActivityEntry {
            id: format!("listing-{}", listing.id),
            text,
            time: format_time_ago(date, now),
            color,
            date,
        });
    }

    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries.truncate(RECENT_ACTIVITY_LIMIT);
    entries
}

/// Largest whole unit elapsed: "3d ago", "5h ago", "12m ago" or "Just now".
pub fn format_time_ago(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(date);

    if elapsed.num_days() > 0 {
        format!("{}d ago", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_minutes() > 0 {
        format!("{}m ago", elapsed.num_minutes())
    } else {
        "Just now".to_string()
    }
}
