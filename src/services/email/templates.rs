use anyhow::Result;
use handlebars::Handlebars;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();

        handlebars.register_template_string("booking_confirmation", BOOKING_CONFIRMATION_TEMPLATE)?;
        handlebars.register_template_string("payment_failed", PAYMENT_FAILED_TEMPLATE)?;

        Ok(Self { handlebars })
    }

    pub fn render(&self, template_name: &str, data: &HashMap<&str, String>) -> Result<String> {
        let rendered = self.handlebars.render(template_name, data)?;
        Ok(rendered)
    }
}

const BOOKING_CONFIRMATION_TEMPLATE: &str = r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Booking Confirmed - {{app_name}}</title>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 0; }
        .container { max-width: 600px; margin: 0 auto; padding: 20px; }
        .header { background: linear-gradient(135deg, #1a1a2e 0%, #e94560 100%); color: white; padding: 30px; text-align: center; border-radius: 10px 10px 0 0; }
        .content { background: white; padding: 30px; border: 1px solid #ddd; }
        .footer { background: #f8f9fa; padding: 20px; text-align: center; font-size: 12px; color: #666; border-radius: 0 0 10px 10px; }
        .code { font-family: monospace; font-size: 24px; letter-spacing: 4px; background: #f8f9fa; padding: 12px 24px; border-radius: 6px; display: inline-block; border: 2px dashed #e94560; }
        .details td { padding: 6px 12px; border-bottom: 1px solid #eee; }
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{{app_name}}</h1>
            <p>Booking Confirmed</p>
        </div>
        <div class="content">
            <h2>Hi {{contact_name}},</h2>
            <p>Your payment went through and your booking for <strong>{{event_title}}</strong> is confirmed. Show this code at the venue:</p>
            <div style="text-align: center; margin: 20px 0;">
                <span class="code">{{booking_code}}</span>
            </div>
            <table class="details" style="width: 100%;">
                <tr><td>Date</td><td>{{selected_date}}</td></tr>
                <tr><td>Time</td><td>{{selected_time}}</td></tr>
                <tr><td>Tier</td><td>{{price_tier}}</td></tr>
                <tr><td>Party size</td><td>{{member_count}}</td></tr>
                <tr><td>Amount paid</td><td>{{total_amount}}</td></tr>
            </table>
            {{#if ticket_url}}
            <p>Your tickets are attached to this booking and can be downloaded here:</p>
            <p style="background: #f8f9fa; padding: 10px; border-radius: 5px; word-break: break-all;">{{ticket_url}}</p>
            {{/if}}
            <p>Each member of your party has an individual entry code on their ticket. Tickets are validated once at the door.</p>
        </div>
        <div class="footer">
            <p>© 2026 {{app_name}}. All rights reserved.</p>
            <p>This email was sent because a booking was made with this address.</p>
        </div>
    </div>
</body>
</html>
"#;

const PAYMENT_FAILED_TEMPLATE: &str = r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Payment Failed - {{app_name}}</title>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 0; }
        .container { max-width: 600px; margin: 0 auto; padding: 20px; }
        .header { background: linear-gradient(135deg, #6c757d 0%, #dc3545 100%); color: white; padding: 30px; text-align: center; border-radius: 10px 10px 0 0; }
        .content { background: white; padding: 30px; border: 1px solid #ddd; }
        .footer { background: #f8f9fa; padding: 20px; text-align: center; font-size: 12px; color: #666; border-radius: 0 0 10px 10px; }
        .warning { background: #fff3cd; border-left: 4px solid #ffc107; padding: 15px; margin: 20px 0; }
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{{app_name}}</h1>
            <p>Payment Unsuccessful</p>
        </div>
        <div class="content">
            <h2>Hi {{contact_name}},</h2>
            <p>We couldn't confirm the payment for booking <strong>{{booking_code}}</strong> ({{event_title}}).</p>
            <div class="warning">
                <p>Your booking is still held and no seats were lost. You can retry the payment from the booking page at any time.</p>
            </div>
            <p>If the amount was debited from your account, it is typically reversed by your bank within 5-7 business days.</p>
        </div>
        <div class="footer">
            <p>© 2026 {{app_name}}. All rights reserved.</p>
        </div>
    </div>
</body>
</html>
"#;
