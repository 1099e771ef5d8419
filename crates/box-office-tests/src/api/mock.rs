//! Mock transport handing requests directly to a [`Router`]

use std::sync::Arc;

use box_office_core::{RawRequest, Request, RequestHandler, Response, ShowId};
use box_office_engine::Router;
use tokio::sync::oneshot;
use tokio::task::{self, JoinHandle};

use super::{Api, RequestMsg};

pub struct MockRouter {
    router: Arc<Router>,
    join_handles: Vec<JoinHandle<()>>,
}

struct MockRawRequest {
    response_channel: oneshot::Sender<Response>,
}

pub async fn start(threads: u16, router: Router) -> (MockRouter, Api) {
    let router = Arc::new(router);

    let it = (0..threads).map(|_| {
        let (sender, receiver) = flume::bounded::<RequestMsg>(65536);
        let router = router.clone();
        let handle = task::spawn_blocking(move || {
            let router = &*router;
            for msg in receiver.into_iter() {
                let raw = Box::new(MockRawRequest {
                    response_channel: msg.response_channel,
                });
                router.handle(Request::from_raw(msg.show, msg.seats, raw))
            }
        });
        (sender, handle)
    });
    let (senders, join_handles) = it.unzip();

    let mock_router = MockRouter {
        router,
        join_handles,
    };
    (mock_router, Api::new(senders))
}

impl MockRouter {
    pub fn shows(&self) -> Vec<(ShowId, u8)> {
        self.router.shows()
    }

    pub async fn shutdown(self) {
        for handle in self.join_handles {
            handle.await.unwrap()
        }
        task::spawn_blocking(move || Arc::into_inner(self.router).unwrap().shutdown())
            .await
            .unwrap();
    }
}

impl RawRequest for MockRawRequest {
    fn respond(self: Box<Self>, response: Response) {
        // the session may have given up waiting
        let _ = self.response_channel.send(response);
    }
}
