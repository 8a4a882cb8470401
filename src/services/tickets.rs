use crate::models::Booking;
use anyhow::{anyhow, Result};
use qrcode::render::svg;
use qrcode::QrCode;

/// Renders printable HTML tickets, one pass per booking with a card
/// per party member. Each card carries a QR of the member's entry code
/// so the door scanner can validate members individually.
pub struct TicketRenderer;

impl TicketRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render_booking_tickets(&self, booking: &Booking) -> Result<Vec<u8>> {
        let booked_on = booking
            .created_at
            .format("%B %d, %Y at %I:%M %p UTC")
            .to_string();

        let mut member_cards = String::new();
        for member in booking.members.0.iter() {
            let member_code = member
                .member_code
                .as_deref()
                .ok_or_else(|| anyhow!("Booking {} has a member without an entry code", booking.code))?;

            let qr_code = QrCode::new(member_code)
                .map_err(|e| anyhow!("Failed to generate QR code: {}", e))?;
            let qr_svg = qr_code
                .render::<svg::Color>()
                .min_dimensions(180, 180)
                .build();

            member_cards.push_str(&format!(
                r#"
        <div class="ticket">
            <div class="header">
                <p class="title">FUSIONX</p>
                <p class="subtitle">{event_title}</p>
            </div>
            <div class="details">
                <div><span class="label">Attendee</span><br>{member_name}</div>
                <div><span class="label">Entry Code</span><br><span class="mono">{member_code}</span></div>
                <div><span class="label">Date</span><br>{date} {time}</div>
                <div><span class="label">Tier</span><br>{tier}</div>
            </div>
            <div class="qr">{qr_svg}</div>
            <div class="fine-print">
                Booking {booking_code} · Booked on {booked_on} · Valid for one entry
            </div>
        </div>
"#,
                event_title = booking.event_title,
                member_name = member.name,
                member_code = member_code,
                date = booking.selected_date,
                time = booking.selected_time,
                tier = booking.price_tier,
                qr_svg = qr_svg,
                booking_code = booking.code,
                booked_on = booked_on,
            ));
        }

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>FusionX Tickets - {booking_code}</title>
    <style>
        @media print {{
            body {{ margin: 0; }}
            .ticket {{ page-break-after: always; }}
        }}
        body {{
            font-family: Arial, sans-serif;
            background: white;
            color: #333;
            line-height: 1.4;
            max-width: 600px;
            margin: 0 auto;
            padding: 20px;
        }}
        .ticket {{
            border: 3px solid #1a1a2e;
            border-radius: 12px;
            padding: 30px;
            margin-bottom: 30px;
            background: linear-gradient(135deg, #f8f9fa 0%, #e9ecef 100%);
            box-shadow: 0 4px 6px rgba(0,0,0,0.1);
        }}
        .header {{
            text-align: center;
            border-bottom: 2px solid #1a1a2e;
            padding-bottom: 20px;
            margin-bottom: 25px;
        }}
        .title {{
            font-size: 32px;
            font-weight: bold;
            color: #1a1a2e;
            margin: 0;
            letter-spacing: 4px;
        }}
        .subtitle {{
            font-size: 14px;
            color: #6c757d;
            margin: 10px 0 0 0;
            text-transform: uppercase;
            letter-spacing: 2px;
        }}
        .details {{
            display: grid;
            grid-template-columns: 1fr 1fr;
            gap: 20px;
            margin: 25px 0;
        }}
        .label {{
            font-size: 11px;
            text-transform: uppercase;
            color: #6c757d;
            letter-spacing: 1px;
        }}
        .mono {{
            font-family: monospace;
            font-size: 18px;
            letter-spacing: 2px;
        }}
        .qr {{
            text-align: center;
            margin: 20px 0;
        }}
        .fine-print {{
            text-align: center;
            font-size: 11px;
            color: #6c757d;
            border-top: 1px dashed #adb5bd;
            padding-top: 12px;
        }}
    </style>
</head>
<body>
{member_cards}
</body>
</html>"#,
            booking_code = booking.code,
            member_cards = member_cards,
        );

        Ok(html.into_bytes())
    }
}
