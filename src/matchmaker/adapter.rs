//! Translation from a player's match request to ticket creation parameters

use crate::types::{CreateTicketOptions, MatchRequest, TicketPlayer};

/// Build the player list and options for a `create_ticket` call
///
/// The requesting player is the only entry on the ticket and carries the
/// request's player attributes; ticket attributes go on the options.
pub fn to_ticket_request(request: &MatchRequest) -> (Vec<TicketPlayer>, CreateTicketOptions) {
    let players = vec![TicketPlayer {
        id: request.player_id.clone(),
        attributes: request.player_attributes.clone(),
    }];

    let options = CreateTicketOptions {
        queue_name: request.queue_name.clone(),
        attributes: request.ticket_attributes.clone(),
    };

    (players, options)
}
