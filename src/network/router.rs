//! Message Router
//!
//! Owns the session store and the connection table. Every inbound frame
//! and lifecycle event is handled here, one at a time, by a single task.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::game::card::CardGenerator;
use crate::game::state::PlayerId;
use crate::network::broadcast::Broadcaster;
use crate::network::connection::{Connection, ConnectionId, ConnectionRole, Outbound};
use crate::network::protocol::{
    BingoRejected, ClientMessage, GameJoined, NewCard, NumberCalled, PlayerLeft,
    PlayerSummary, PlayerWon, ProtocolError, ServerMessage,
};
use crate::network::session::{ClaimOutcome, Session, SessionConfig, SessionError};

/// Events fed to the router task by connection tasks.
#[derive(Debug)]
pub enum RouterEvent {
    /// A socket finished its handshake.
    Attached {
        /// New connection id.
        conn: ConnectionId,
        /// Its outbound queue.
        sender: Outbound,
    },
    /// A text frame arrived.
    Text {
        /// Sender.
        conn: ConnectionId,
        /// Frame body.
        text: String,
    },
    /// A binary frame arrived.
    Binary {
        /// Sender.
        conn: ConnectionId,
        /// Frame body.
        data: Vec<u8>,
    },
    /// The socket closed.
    Detached {
        /// Closed connection.
        conn: ConnectionId,
    },
}

/// The message router.
pub struct Router {
    /// Authoritative game state.
    session: Session,
    /// Live connections and their roles.
    connections: BTreeMap<ConnectionId, Connection>,
    /// Card source.
    generator: CardGenerator,
}

impl Router {
    /// Create a router whose cards are seeded from the new session's id.
    pub fn new(config: SessionConfig) -> Self {
        let session = Session::new(config);
        debug!("Session {} started", hex::encode(&session.id()[..4]));

        Self {
            generator: CardGenerator::with_seed(session.card_seed()),
            session,
            connections: BTreeMap::new(),
        }
    }

    /// Create a router with a specific card generator.
    pub fn with_generator(config: SessionConfig, generator: CardGenerator) -> Self {
        Self {
            session: Session::new(config),
            connections: BTreeMap::new(),
            generator,
        }
    }

    /// Read access to the session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Role of a connection, if attached.
    pub fn role(&self, conn: ConnectionId) -> Option<ConnectionRole> {
        self.connections.get(&conn).map(|c| c.role)
    }

    /// Get active connection count.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn broadcaster(&self) -> Broadcaster<'_> {
        Broadcaster::new(&self.connections, self.session.host())
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Handle one event.
    pub fn handle_event(&mut self, event: RouterEvent) {
        match event {
            RouterEvent::Attached { conn, sender } => self.attach(conn, sender),
            RouterEvent::Text { conn, text } => self.dispatch(conn, ClientMessage::from_json(&text)),
            RouterEvent::Binary { conn, data } => self.dispatch(conn, ClientMessage::from_bytes(&data)),
            RouterEvent::Detached { conn } => self.detach(conn),
        }
    }

    /// Register a new, unidentified connection.
    pub fn attach(&mut self, conn: ConnectionId, sender: Outbound) {
        self.connections.insert(conn, Connection::new(sender));
        debug!("{} attached ({} connections)", conn, self.connections.len());
    }

    /// Forget a connection and clean up its role.
    pub fn detach(&mut self, conn: ConnectionId) {
        let Some(connection) = self.connections.remove(&conn) else {
            return;
        };

        match connection.role {
            ConnectionRole::Host => {
                if self.session.clear_host(conn) {
                    info!("Host {} disconnected", conn);
                }
            }
            ConnectionRole::Player(id) => {
                if let Some(player) = self.session.remove_player(&id) {
                    let stayed = chrono::Utc::now() - player.joined_at;
                    info!("Player {} ({}) left after {}s", id.short(), player.name, stayed.num_seconds());
                    self.broadcaster().notify_host(ServerMessage::PlayerLeft(PlayerLeft { id }));
                }
            }
            ConnectionRole::Unidentified => {}
        }

        debug!("{} detached ({} connections)", conn, self.connections.len());
    }

    /// Route a parsed (or unparseable) frame.
    pub fn dispatch(&mut self, conn: ConnectionId, parsed: Result<ClientMessage, ProtocolError>) {
        match parsed {
            Ok(msg) => self.handle(conn, msg),
            Err(e) if e.is_unknown_type() => debug!("Ignoring message from {}: {}", conn, e),
            Err(e) => warn!("Dropping message from {}: {}", conn, e),
        }
    }

    /// Route a typed message.
    pub fn handle(&mut self, conn: ConnectionId, msg: ClientMessage) {
        let Some(role) = self.role(conn) else {
            debug!("Message from unknown {}", conn);
            return;
        };

        match (msg, role) {
            (ClientMessage::HostConnect, ConnectionRole::Unidentified | ConnectionRole::Host) => {
                self.connect_host(conn);
            }
            (ClientMessage::PlayerJoin(req), ConnectionRole::Unidentified) => {
                self.join_player(conn, req.name.as_deref());
            }
            (ClientMessage::HostDrawNumber(req), ConnectionRole::Host) => {
                self.draw_number(conn, req.number);
            }
            (ClientMessage::HostResetGame, ConnectionRole::Host) => {
                self.reset_game(conn);
            }
            (ClientMessage::PlayerClaimBingo(req), ConnectionRole::Player(id)) => {
                self.claim_bingo(conn, id, &req.marks);
            }
            (msg, role) => {
                debug!("Ignoring {} from {} with role {:?}", msg.kind(), conn, role);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Make `conn` the host and send it the current snapshot.
    fn connect_host(&mut self, conn: ConnectionId) {
        if let Some(displaced) = self.session.set_host(conn) {
            debug!("Host {} displaced by {}", displaced, conn);
        }
        if let Some(connection) = self.connections.get_mut(&conn) {
            connection.role = ConnectionRole::Host;
        }

        info!("Host connected on {}", conn);
        let snapshot = self.session.snapshot();
        self.broadcaster().send_to(conn, ServerMessage::InitHost(snapshot));
    }

    /// Register a player on `conn`, deal a card and tell the host.
    fn join_player(&mut self, conn: ConnectionId, name: Option<&str>) -> PlayerId {
        let card = self.generator.generate();
        let player = self.session.add_player(name, card);
        let (id, name, card) = (player.id, player.name.clone(), player.card.clone());

        if let Some(connection) = self.connections.get_mut(&conn) {
            connection.role = ConnectionRole::Player(id);
        }

        info!("Player {} ({}) joined on {}", id.short(), name, conn);

        let broadcaster = self.broadcaster();
        broadcaster.send_to(conn, ServerMessage::GameJoined(GameJoined {
            id,
            card,
            called_numbers: self.session.called_numbers().to_vec(),
        }));
        broadcaster.notify_host(ServerMessage::PlayerJoined(PlayerSummary {
            id,
            name,
            wins: None,
        }));

        id
    }

    /// Call `number` if `conn` is the current host.
    fn draw_number(&mut self, conn: ConnectionId, number: u32) -> bool {
        if !self.session.is_host(conn) {
            debug!("Ignoring draw from stale host {}", conn);
            return false;
        }

        match self.session.record_draw(number) {
            Ok(()) => {
                info!("Number {} called ({} so far)", number, self.session.called_numbers().len());
                self.broadcaster().broadcast(ServerMessage::NumberCalled(NumberCalled { number }));
                true
            }
            Err(e @ SessionError::AlreadyCalled(_)) => {
                debug!("{}", e);
                false
            }
            Err(e) => {
                warn!("Rejected draw from {}: {}", conn, e);
                false
            }
        }
    }

    /// Clear called numbers and deal every player a new card.
    fn reset_game(&mut self, conn: ConnectionId) -> bool {
        if !self.session.is_host(conn) {
            debug!("Ignoring reset from stale host {}", conn);
            return false;
        }

        let generator = &mut self.generator;
        let dealt = self.session.reset_round(|| generator.generate());

        let broadcaster = self.broadcaster();
        for connection in self.connections.values() {
            let Some(id) = connection.player_id() else {
                continue;
            };
            if let Some((_, card)) = dealt.iter().find(|(dealt_id, _)| *dealt_id == id) {
                connection.send(ServerMessage::GameResetNewCard(NewCard { card: card.clone() }));
            }
        }
        broadcaster.send_to(conn, ServerMessage::GameResetConfirmed {});

        info!("Game reset, {} new cards dealt", dealt.len());
        true
    }

    /// Evaluate a claim from player `id` on `conn`.
    fn claim_bingo(&mut self, conn: ConnectionId, id: PlayerId, marks: &[i64]) -> Option<bool> {
        let outcome = match self.session.evaluate_claim(&id, marks) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("Ignoring claim from {}: {}", conn, e);
                return None;
            }
        };

        let broadcaster = self.broadcaster();
        match outcome {
            ClaimOutcome::Accepted { name, line, wins } => {
                info!("Player {} ({}) won with {:?} (win #{})", id.short(), name, line, wins);
                broadcaster.broadcast(ServerMessage::PlayerWon(PlayerWon { name }));
                Some(true)
            }
            ClaimOutcome::Rejected { reason } => {
                debug!("Claim from player {} rejected", id.short());
                broadcaster.send_to(conn, ServerMessage::BingoRejected(BingoRejected { reason }));
                Some(false)
            }
        }
    }
}

/// Drive the router until every event sender is gone.
pub async fn run_router(mut router: Router, mut events: mpsc::UnboundedReceiver<RouterEvent>) -> Router {
    while let Some(event) = events.recv().await {
        router.handle_event(event);
    }
    debug!("Router stopped");
    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::{Card, Cell, CARD_SIZE};
    use crate::network::protocol::{ClaimRequest, DrawRequest, JoinRequest};
    use crate::network::session::CLAIM_REJECTED_REASON;

    type Inbox = mpsc::UnboundedReceiver<ServerMessage>;

    fn create_test_router() -> Router {
        Router::with_generator(SessionConfig::default(), CardGenerator::with_seed(42))
    }

    fn attach(router: &mut Router, id: u64) -> (ConnectionId, Inbox) {
        let conn = ConnectionId(id);
        let (tx, rx) = mpsc::unbounded_channel();
        router.attach(conn, tx);
        (conn, rx)
    }

    fn drain(inbox: &mut Inbox) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = inbox.try_recv() {
            messages.push(msg);
        }
        messages
    }

    fn join(router: &mut Router, conn: ConnectionId, name: &str) {
        router.handle(conn, ClientMessage::PlayerJoin(JoinRequest { name: Some(name.into()) }));
    }

    fn draw(router: &mut Router, conn: ConnectionId, number: u32) {
        router.handle(conn, ClientMessage::HostDrawNumber(DrawRequest { number }));
    }

    fn claim(router: &mut Router, conn: ConnectionId, marks: &[i64]) {
        router.handle(conn, ClientMessage::PlayerClaimBingo(ClaimRequest { marks: marks.to_vec() }));
    }

    fn player_id(router: &Router, conn: ConnectionId) -> PlayerId {
        match router.role(conn) {
            Some(ConnectionRole::Player(id)) => id,
            other => panic!("not a player: {:?}", other),
        }
    }

    /// Card with column 2 = [7, 23, FREE, 41, 9].
    fn ann_card() -> Card {
        let mut columns = [[Cell::Free; CARD_SIZE]; CARD_SIZE];
        let values = [
            [1, 2, 3, 4, 5],
            [11, 12, 13, 14, 15],
            [7, 23, 0, 41, 9],
            [31, 32, 33, 34, 35],
            [44, 45, 46, 47, 48],
        ];
        for (col, column) in values.iter().enumerate() {
            for (row, value) in column.iter().enumerate() {
                columns[col][row] = Cell::Number(*value);
            }
        }
        Card::from_columns(columns)
    }

    #[test]
    fn test_new_router_deals_from_session_seed() {
        let mut router = Router::new(SessionConfig::default());
        let mut expected = CardGenerator::with_seed(router.session().card_seed());
        let (ann, _ann_rx) = attach(&mut router, 1);

        join(&mut router, ann, "Ann");

        let id = player_id(&router, ann);
        assert_eq!(router.session().player(&id).unwrap().card, expected.generate());
    }

    #[test]
    fn test_host_connect_sends_snapshot() {
        let mut router = create_test_router();
        let (player, _player_rx) = attach(&mut router, 1);
        join(&mut router, player, "Ann");
        let (host, mut host_rx) = attach(&mut router, 2);

        router.handle(host, ClientMessage::HostConnect);

        assert_eq!(router.role(host), Some(ConnectionRole::Host));
        match drain(&mut host_rx).as_slice() {
            [ServerMessage::InitHost(snapshot)] => {
                assert_eq!(snapshot.players.len(), 1);
                assert_eq!(snapshot.players[0].name, "Ann");
                assert_eq!(snapshot.players[0].wins, Some(0));
                assert!(snapshot.called_numbers.is_empty());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_join_replies_and_notifies_host() {
        let mut router = create_test_router();
        let (host, mut host_rx) = attach(&mut router, 1);
        router.handle(host, ClientMessage::HostConnect);
        draw(&mut router, host, 17);
        drain(&mut host_rx);

        let (player, mut player_rx) = attach(&mut router, 2);
        join(&mut router, player, "");
        let id = player_id(&router, player);

        match drain(&mut player_rx).as_slice() {
            [ServerMessage::GameJoined(joined)] => {
                assert_eq!(joined.id, id);
                assert_eq!(joined.called_numbers, vec![17]);
                assert!(joined.card.cell(2, 2).is_free());
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(
            drain(&mut host_rx),
            vec![ServerMessage::PlayerJoined(PlayerSummary { id, name: "Anonymous".into(), wins: None })]
        );
    }

    #[test]
    fn test_second_join_on_same_connection_ignored() {
        let mut router = create_test_router();
        let (player, mut player_rx) = attach(&mut router, 1);

        join(&mut router, player, "Ann");
        let id = player_id(&router, player);
        join(&mut router, player, "Ann again");
        router.handle(player, ClientMessage::HostConnect);

        assert_eq!(router.session().player_count(), 1);
        assert_eq!(player_id(&router, player), id);
        assert!(router.session().host().is_none());
        assert_eq!(drain(&mut player_rx).len(), 1);
    }

    #[test]
    fn test_draw_broadcasts_once_per_number() {
        let mut router = create_test_router();
        let (host, mut host_rx) = attach(&mut router, 1);
        router.handle(host, ClientMessage::HostConnect);
        let (player, mut player_rx) = attach(&mut router, 2);
        join(&mut router, player, "Ann");
        drain(&mut host_rx);
        drain(&mut player_rx);

        draw(&mut router, host, 7);
        draw(&mut router, host, 7);
        draw(&mut router, host, 23);

        let expected = vec![
            ServerMessage::NumberCalled(NumberCalled { number: 7 }),
            ServerMessage::NumberCalled(NumberCalled { number: 23 }),
        ];
        assert_eq!(drain(&mut host_rx), expected);
        assert_eq!(drain(&mut player_rx), expected);
        assert_eq!(router.session().called_numbers(), &[7, 23]);
    }

    #[test]
    fn test_out_of_range_draw_ignored() {
        let mut router = create_test_router();
        let (host, mut host_rx) = attach(&mut router, 1);
        router.handle(host, ClientMessage::HostConnect);
        drain(&mut host_rx);

        draw(&mut router, host, 0);
        draw(&mut router, host, 51);

        assert!(drain(&mut host_rx).is_empty());
        assert!(router.session().called_numbers().is_empty());
    }

    #[test]
    fn test_host_only_messages_from_player_ignored() {
        let mut router = create_test_router();
        let (player, mut player_rx) = attach(&mut router, 1);
        join(&mut router, player, "Ann");
        drain(&mut player_rx);

        draw(&mut router, player, 5);
        router.handle(player, ClientMessage::HostResetGame);

        assert!(router.session().called_numbers().is_empty());
        assert!(drain(&mut player_rx).is_empty());
    }

    #[test]
    fn test_claim_from_non_player_ignored() {
        let mut router = create_test_router();
        let (host, mut host_rx) = attach(&mut router, 1);
        let (lurker, mut lurker_rx) = attach(&mut router, 2);
        router.handle(host, ClientMessage::HostConnect);
        drain(&mut host_rx);

        claim(&mut router, host, &[1, 2, 3]);
        claim(&mut router, lurker, &[1, 2, 3]);

        assert!(drain(&mut host_rx).is_empty());
        assert!(drain(&mut lurker_rx).is_empty());
    }

    #[test]
    fn test_displaced_host_loses_control() {
        let mut router = create_test_router();
        let (old_host, mut old_rx) = attach(&mut router, 1);
        let (new_host, mut new_rx) = attach(&mut router, 2);
        router.handle(old_host, ClientMessage::HostConnect);
        router.handle(new_host, ClientMessage::HostConnect);
        drain(&mut old_rx);
        drain(&mut new_rx);

        draw(&mut router, old_host, 9);
        assert!(router.session().called_numbers().is_empty());

        draw(&mut router, new_host, 9);
        assert!(drain(&mut old_rx).is_empty());
        assert_eq!(drain(&mut new_rx), vec![ServerMessage::NumberCalled(NumberCalled { number: 9 })]);

        // Stale host leaving does not clear the live one
        router.detach(old_host);
        assert_eq!(router.session().host(), Some(new_host));
    }

    #[test]
    fn test_host_disconnect_clears_slot() {
        let mut router = create_test_router();
        let (host, _host_rx) = attach(&mut router, 1);
        router.handle(host, ClientMessage::HostConnect);

        router.detach(host);
        assert!(router.session().host().is_none());

        // A stale reference to the closed connection has no effect
        draw(&mut router, host, 4);
        assert!(router.session().called_numbers().is_empty());
    }

    #[test]
    fn test_player_disconnect_notifies_host() {
        let mut router = create_test_router();
        let (host, mut host_rx) = attach(&mut router, 1);
        router.handle(host, ClientMessage::HostConnect);
        let (player, _player_rx) = attach(&mut router, 2);
        join(&mut router, player, "Ann");
        let id = player_id(&router, player);
        drain(&mut host_rx);

        router.detach(player);

        assert_eq!(drain(&mut host_rx), vec![ServerMessage::PlayerLeft(PlayerLeft { id })]);
        assert_eq!(router.session().player_count(), 0);

        draw(&mut router, host, 3);
        assert_eq!(router.broadcaster().broadcast(ServerMessage::GameResetConfirmed {}), 1);
    }

    #[test]
    fn test_reset_deals_new_cards() {
        let mut router = create_test_router();
        let (host, mut host_rx) = attach(&mut router, 1);
        router.handle(host, ClientMessage::HostConnect);
        let (player, mut player_rx) = attach(&mut router, 2);
        join(&mut router, player, "Ann");
        let id = player_id(&router, player);
        let old_card = router.session().player(&id).unwrap().card.clone();
        draw(&mut router, host, 10);
        drain(&mut host_rx);
        drain(&mut player_rx);

        router.handle(host, ClientMessage::HostResetGame);

        assert!(router.session().called_numbers().is_empty());
        assert_eq!(router.session().player_count(), 1);
        assert_eq!(drain(&mut host_rx), vec![ServerMessage::GameResetConfirmed {}]);
        match drain(&mut player_rx).as_slice() {
            [ServerMessage::GameResetNewCard(new_card)] => {
                assert_ne!(new_card.card.numbers(), old_card.numbers());
                assert_eq!(router.session().player(&id).unwrap().card, new_card.card);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_winning_claim_broadcast() {
        let mut router = create_test_router();
        let (host, mut host_rx) = attach(&mut router, 1);
        router.handle(host, ClientMessage::HostConnect);
        let (ann, mut ann_rx) = attach(&mut router, 2);
        let (bo, mut bo_rx) = attach(&mut router, 3);
        join(&mut router, ann, "Ann");
        join(&mut router, bo, "Bo");
        let ann_id = player_id(&router, ann);
        router.session.player_mut(&ann_id).unwrap().replace_card(ann_card());

        for n in [7, 23, 41, 9] {
            draw(&mut router, host, n);
        }
        drain(&mut host_rx);
        drain(&mut ann_rx);
        drain(&mut bo_rx);

        claim(&mut router, ann, &[7, 23, 41, 9]);

        let won = vec![ServerMessage::PlayerWon(PlayerWon { name: "Ann".into() })];
        assert_eq!(drain(&mut host_rx), won);
        assert_eq!(drain(&mut ann_rx), won);
        assert_eq!(drain(&mut bo_rx), won);

        // No lock-out after a win
        claim(&mut router, ann, &[7, 23, 41, 9]);
        assert_eq!(drain(&mut host_rx), won);
        assert_eq!(router.session().player(&ann_id).unwrap().wins, 2);
    }

    #[test]
    fn test_end_to_end_rejected_claim() {
        let mut router = create_test_router();
        let (host, mut host_rx) = attach(&mut router, 1);
        router.handle(host, ClientMessage::HostConnect);

        let (ann, mut ann_rx) = attach(&mut router, 2);
        join(&mut router, ann, "Ann");
        let ann_id = player_id(&router, ann);
        match drain(&mut ann_rx).as_slice() {
            [ServerMessage::GameJoined(joined)] => assert!(joined.called_numbers.is_empty()),
            other => panic!("unexpected: {:?}", other),
        }
        router.session.player_mut(&ann_id).unwrap().replace_card(ann_card());

        for n in [7, 23, 41] {
            draw(&mut router, host, n);
        }
        drain(&mut host_rx);
        drain(&mut ann_rx);

        claim(&mut router, ann, &[7, 23, 41]);

        assert_eq!(
            drain(&mut ann_rx),
            vec![ServerMessage::BingoRejected(BingoRejected { reason: CLAIM_REJECTED_REASON.into() })]
        );
        assert!(drain(&mut host_rx).is_empty());
    }

    #[test]
    fn test_claim_with_undrawn_line_rejected() {
        let mut router = create_test_router();
        let (ann, mut ann_rx) = attach(&mut router, 1);
        join(&mut router, ann, "Ann");
        let ann_id = player_id(&router, ann);
        router.session.player_mut(&ann_id).unwrap().replace_card(ann_card());
        drain(&mut ann_rx);

        claim(&mut router, ann, &[7, 23, 41, 9]);

        assert!(matches!(drain(&mut ann_rx).as_slice(), [ServerMessage::BingoRejected(_)]));
    }

    #[test]
    fn test_claim_with_null_marks_rejected() {
        let mut router = create_test_router();
        let (ann, mut ann_rx) = attach(&mut router, 1);
        join(&mut router, ann, "Ann");
        drain(&mut ann_rx);

        router.handle_event(RouterEvent::Text {
            conn: ann,
            text: r#"{"type":"player_claim_bingo","payload":{"marks":null}}"#.into(),
        });

        assert_eq!(
            drain(&mut ann_rx),
            vec![ServerMessage::BingoRejected(BingoRejected { reason: CLAIM_REJECTED_REASON.into() })]
        );
    }

    #[test]
    fn test_claim_with_negative_mark_still_evaluated() {
        let mut router = create_test_router();
        let (host, mut host_rx) = attach(&mut router, 1);
        router.handle(host, ClientMessage::HostConnect);
        let (ann, mut ann_rx) = attach(&mut router, 2);
        join(&mut router, ann, "Ann");
        let ann_id = player_id(&router, ann);
        router.session.player_mut(&ann_id).unwrap().replace_card(ann_card());
        for n in [7, 23, 41, 9] {
            draw(&mut router, host, n);
        }
        drain(&mut host_rx);
        drain(&mut ann_rx);

        router.handle_event(RouterEvent::Text {
            conn: ann,
            text: r#"{"type":"player_claim_bingo","payload":{"marks":[7,-1,23,41,9]}}"#.into(),
        });

        let won = vec![ServerMessage::PlayerWon(PlayerWon { name: "Ann".into() })];
        assert_eq!(drain(&mut ann_rx), won);
        assert_eq!(drain(&mut host_rx), won);
        assert_eq!(router.session().player(&ann_id).unwrap().marks.len(), 4);
    }

    #[test]
    fn test_malformed_and_unknown_frames_keep_connection() {
        let mut router = create_test_router();
        let (host, mut host_rx) = attach(&mut router, 1);

        router.handle_event(RouterEvent::Text { conn: host, text: "{oops".into() });
        router.handle_event(RouterEvent::Text { conn: host, text: r#"{"type":"dance"}"#.into() });
        router.handle_event(RouterEvent::Binary { conn: host, data: vec![0xff] });
        assert_eq!(router.connection_count(), 1);
        assert!(drain(&mut host_rx).is_empty());

        router.handle_event(RouterEvent::Text { conn: host, text: r#"{"type":"host_connect"}"#.into() });
        assert!(matches!(drain(&mut host_rx).as_slice(), [ServerMessage::InitHost(_)]));
    }

    #[tokio::test]
    async fn test_run_router_processes_events_in_order() {
        let router = create_test_router();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = ConnectionId(1);

        events_tx.send(RouterEvent::Attached { conn, sender: tx }).unwrap();
        events_tx.send(RouterEvent::Text { conn, text: r#"{"type":"host_connect"}"#.into() }).unwrap();
        events_tx.send(RouterEvent::Text {
            conn,
            text: r#"{"type":"host_draw_number","payload":{"number":12}}"#.into(),
        }).unwrap();
        events_tx.send(RouterEvent::Detached { conn }).unwrap();
        drop(events_tx);

        let router = run_router(router, events_rx).await;

        assert!(matches!(rx.recv().await, Some(ServerMessage::InitHost(_))));
        assert_eq!(rx.recv().await, Some(ServerMessage::NumberCalled(NumberCalled { number: 12 })));
        assert_eq!(router.connection_count(), 0);
        assert!(router.session().host().is_none());
        assert_eq!(router.session().called_numbers(), &[12]);
    }
}
