//! Scripted printers for bridge tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use puente_impresion::PrinterFactory;
use puente_printer::{PrintError, PrintResult, Printer};
use shared::PrinterType;
use tokio::sync::{Semaphore, mpsc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Accept,
    Refuse,
    Hang,
}

/// Printer factory recording every ticket it receives
///
/// With a gate, each print waits for one permit from [`FakeFactory::release`].
pub struct FakeFactory {
    behavior: Behavior,
    gate: Option<Arc<Semaphore>>,
    printed: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    started: mpsc::UnboundedSender<String>,
}

impl FakeFactory {
    pub fn new(behavior: Behavior) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        Self::build(behavior, None)
    }

    pub fn gated(behavior: Behavior) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        Self::build(behavior, Some(Arc::new(Semaphore::new(0))))
    }

    fn build(
        behavior: Behavior,
        gate: Option<Arc<Semaphore>>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (started, rx) = mpsc::unbounded_channel();
        let factory = Arc::new(Self {
            behavior,
            gate,
            printed: Arc::new(Mutex::new(Vec::new())),
            started,
        });
        (factory, rx)
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    /// Targets and plain text of the printed tickets
    pub fn printed(&self) -> Vec<(String, String)> {
        self.printed
            .lock()
            .iter()
            .map(|(target, data)| (target.clone(), String::from_utf8_lossy(data).into_owned()))
            .collect()
    }
}

impl PrinterFactory for FakeFactory {
    fn open(&self, _: PrinterType, target: &str) -> PrintResult<Box<dyn Printer>> {
        Ok(Box::new(FakePrinter {
            target: target.to_string(),
            behavior: self.behavior,
            gate: self.gate.clone(),
            printed: self.printed.clone(),
            started: self.started.clone(),
        }))
    }
}

struct FakePrinter {
    target: String,
    behavior: Behavior,
    gate: Option<Arc<Semaphore>>,
    printed: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    started: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Printer for FakePrinter {
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let _ = self.started.send(self.target.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.map_err(|e| PrintError::Offline(e.to_string()))?.forget();
        }
        match self.behavior {
            Behavior::Accept => {
                self.printed.lock().push((self.target.clone(), data.to_vec()));
                Ok(())
            }
            Behavior::Refuse => Err(PrintError::Connection(format!("{} refused", self.target))),
            Behavior::Hang => std::future::pending().await,
        }
    }

    async fn is_online(&self) -> bool {
        self.behavior != Behavior::Refuse
    }

    fn describe(&self) -> String {
        format!("fake:{}", self.target)
    }
}

/// Job body as the POS backend publishes it
pub fn job_body(target: &str, mesa: &str) -> String {
    format!(
        r#"{{"printerType":"TCP","printerTarget":"{target}","ticketType":"COCINA",
            "ticketData":{{"nombreMesa":"{mesa}","comandaId":42,"fechaHora":[2024,5,17,13,45,10],
            "items":[{{"nombreProducto":"Burger","cantidad":2,"precioTotal":20.0}}],"total":20.0}}}}"#
    )
}
