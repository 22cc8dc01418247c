use std::fmt::Write;

use crate::models::{DashboardView, GrowthResult, SkipReason};

fn growth_label(growth: &GrowthResult) -> String {
    let arrow = if growth.is_increase { "up" } else { "down" };
    format!("{arrow} {}% vs previous 7 days", growth.percentage)
}

pub fn build_report(view: &DashboardView) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# BizNest Admin Dashboard");
    let _ = writeln!(
        output,
        "Generated at {}",
        view.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(
        output,
        "- Total users: {} ({})",
        view.total_users,
        growth_label(&view.user_growth)
    );
    let _ = writeln!(
        output,
        "- Active listings: {} ({})",
        view.listing_stats.active_count,
        growth_label(&view.listing_stats.growth)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## New Users (last 7 days)");
    let _ = writeln!(output, "| Day | Users |");
    let _ = writeln!(output, "| --- | ---: |");
    for point in view.new_users_data.iter() {
        let _ = writeln!(output, "| {} | {} |", point.day, point.users);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## User Approval");
    for segment in view.user_approval_data.iter() {
        let _ = writeln!(output, "- {}: {}", segment.name, segment.value);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Business Listings This Month");
    let _ = writeln!(output, "| Week | Active | Waiting Approval |");
    let _ = writeln!(output, "| --- | ---: | ---: |");
    for point in view.business_listings_data.iter() {
        let _ = writeln!(
            output,
            "| {} | {} | {} |",
            point.week, point.active, point.waiting_approval
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Activity");
    if view.recent_activity.is_empty() {
        let _ = writeln!(output, "No activity recorded yet.");
    } else {
        for entry in view.recent_activity.iter() {
            let _ = writeln!(output, "- {} ({})", entry.text, entry.time);
        }
    }

    if !view.diagnostics.skipped.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Skipped Records");
        for skipped in view.diagnostics.skipped.iter() {
            let reason = match &skipped.reason {
                SkipReason::MissingDate => "no creation date".to_string(),
                SkipReason::UnparseableDate(raw) => format!("unparseable date `{raw}`"),
            };
            let _ = writeln!(output, "- {:?} {}: {}", skipped.kind, skipped.id, reason);
        }
    }

    output
}
