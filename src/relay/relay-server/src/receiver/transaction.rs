/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

use crate::Handler;
use relay_common::{Address, CodeID, Reply, Stage};
use relay_protocol::{MailFromArgs, RcptToArgs};

impl Handler {
    pub(super) async fn on_mail_from_inner(&mut self, args: MailFromArgs) -> Reply {
        let reverse_path = match args.reverse_path.as_deref().map(str::parse::<Address>) {
            None => None,
            Some(Ok(address)) => Some(address),
            Some(Err(error)) => {
                tracing::debug!(error = %format!("{error:#}"), "Invalid reverse path.");
                return self.reply_in_config(CodeID::SyntaxErrorParams);
            }
        };

        self.session.reset_transaction();

        if self
            .router
            .on_mail_from(reverse_path.as_ref(), &mut self.session)
            .await
            .is_admitted()
        {
            self.session.stage = Stage::MailFrom;
            self.reply_in_config(CodeID::Ok)
        } else {
            tracing::info!(
                from = %reverse_path.map_or_else(String::new, |i| i.to_string()),
                "Sender refused by every flow."
            );
            self.reply_in_config(CodeID::Refused)
        }
    }

    pub(super) async fn on_rcpt_to_inner(&mut self, args: RcptToArgs) -> Reply {
        if self.session.envelope.rcpt_to.len() >= self.config.server.smtp.rcpt_count_max {
            return self.reply_in_config(CodeID::TooManyRecipients);
        }

        let forward_path = match args.forward_path.parse::<Address>() {
            Ok(address) => address,
            Err(error) => {
                tracing::debug!(error = %format!("{error:#}"), "Invalid forward path.");
                return self.reply_in_config(CodeID::SyntaxErrorParams);
            }
        };

        if self
            .router
            .on_rcpt_to(&forward_path, &mut self.session)
            .await
            .is_admitted()
        {
            self.session.stage = Stage::RcptTo;
            self.reply_in_config(CodeID::Ok)
        } else {
            tracing::info!(to = %forward_path, "Recipient refused by every flow.");
            self.reply_in_config(CodeID::Refused)
        }
    }
}
