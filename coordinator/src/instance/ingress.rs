use dicepit_types::{game::GameStateValue, AssetId, UserId, Wallet};
use futures::{
    channel::{mpsc, oneshot},
    SinkExt,
};

use crate::Error;

/// Messages sent to a game instance.
pub enum Message {
    /// Open a fresh waiting room (process startup or after a finished game).
    Open {
        response: oneshot::Sender<Result<GameStateValue, Error>>,
    },
    /// Register a user into the waiting room.
    Join {
        user: UserId,
        wallet: Wallet,
        asset: AssetId,
        response: oneshot::Sender<Result<(), Error>>,
    },
    /// Withdraw a user from the waiting room.
    Withdraw {
        user: UserId,
        response: oneshot::Sender<Result<bool, Error>>,
    },
    /// Force the instance back into a fresh waiting room. Cancels an active
    /// game; idempotent when the room is already open.
    Reset {
        response: oneshot::Sender<Result<(), Error>>,
    },
    /// Current machine state.
    State {
        response: oneshot::Sender<GameStateValue>,
    },
}

/// Handle for sending messages to a game instance.
#[derive(Clone)]
pub struct Mailbox {
    sender: mpsc::Sender<Message>,
}

impl Mailbox {
    pub(super) fn new(sender: mpsc::Sender<Message>) -> Self {
        Self { sender }
    }

    pub async fn open(&mut self) -> Result<GameStateValue, Error> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(Message::Open { response })
            .await
            .map_err(|_| Error::InstanceStopped)?;
        receiver.await.map_err(|_| Error::InstanceStopped)?
    }

    pub async fn join(&mut self, user: UserId, wallet: Wallet, asset: AssetId) -> Result<(), Error> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(Message::Join {
                user,
                wallet,
                asset,
                response,
            })
            .await
            .map_err(|_| Error::InstanceStopped)?;
        receiver.await.map_err(|_| Error::InstanceStopped)?
    }

    pub async fn withdraw(&mut self, user: UserId) -> Result<bool, Error> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(Message::Withdraw { user, response })
            .await
            .map_err(|_| Error::InstanceStopped)?;
        receiver.await.map_err(|_| Error::InstanceStopped)?
    }

    pub async fn reset(&mut self) -> Result<(), Error> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(Message::Reset { response })
            .await
            .map_err(|_| Error::InstanceStopped)?;
        receiver.await.map_err(|_| Error::InstanceStopped)?
    }

    pub async fn state(&mut self) -> Result<GameStateValue, Error> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(Message::State { response })
            .await
            .map_err(|_| Error::InstanceStopped)?;
        receiver.await.map_err(|_| Error::InstanceStopped)
    }
}
