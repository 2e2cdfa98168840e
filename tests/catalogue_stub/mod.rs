use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const PAGE_1: &str = r#"<!doctype html>
<html>
  <head><title>All products | Books to Scrape</title></head>
  <body>
    <ol class="row">
      <li>
        <article class="product_pod">
          <p class="star-rating Three"><i class="icon-star"></i></p>
          <h3><a href="a-light-in-the-attic_1000/index.html" title="A Light in the Attic">A Light in the ...</a></h3>
          <div class="product_price">
            <p class="price_color">£51.77</p>
            <p class="instock availability"><i class="icon-ok"></i>
              In stock
            </p>
          </div>
        </article>
      </li>
      <li>
        <article class="product_pod">
          <p class="star-rating One"></p>
          <h3><a href="tipping-the-velvet_999/index.html" title="Tipping the Velvet">Tipping the ...</a></h3>
          <div class="product_price">
            <p class="price_color">£53.74</p>
            <p class="instock availability">In stock</p>
          </div>
        </article>
      </li>
    </ol>
    <ul class="pager">
      <li class="current">Page 1 of 2</li>
      <li class="next"><a href="page-2.html">next</a></li>
    </ul>
  </body>
</html>
"#;

const PAGE_2: &str = r#"<!doctype html>
<html>
  <body>
    <ol class="row">
      <li>
        <article class="product_pod">
          <p class="star-rating Three"></p>
          <h3><a href="soumission_998/index.html" title="Soumission">Soumission</a></h3>
          <div class="product_price">
            <p class="instock availability">Out of stock</p>
          </div>
        </article>
      </li>
    </ol>
    <ul class="pager">
      <li class="previous"><a href="page-1.html">previous</a></li>
      <li class="current">Page 2 of 2</li>
    </ul>
  </body>
</html>
"#;

const DETAIL_ATTIC: &str = r#"<!doctype html>
<html>
  <body>
    <table class="table table-striped">
      <tr><th>UPC</th><td>a897fe39b1053632</td></tr>
      <tr><th>Number of reviews</th><td>3</td></tr>
    </table>
  </body>
</html>
"#;

const DETAIL_VELVET: &str = r#"<!doctype html>
<html>
  <body>
    <table class="table table-striped">
      <tr><th>Number of reviews</th><td>0</td></tr>
    </table>
  </body>
</html>
"#;

pub struct CatalogueStub {
    pub base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CatalogueStub {
    /// Serves a two-page catalogue under `/catalogue/`. Page 3 and the third
    /// book's detail page answer 404.
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start catalogue stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let (status, body) = match request.url() {
                    "/catalogue/page-1.html" => (200, PAGE_1),
                    "/catalogue/page-2.html" => (200, PAGE_2),
                    "/catalogue/a-light-in-the-attic_1000/index.html" => (200, DETAIL_ATTIC),
                    "/catalogue/tipping-the-velvet_999/index.html" => (200, DETAIL_VELVET),
                    _ => (404, "not found"),
                };

                let header = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    &b"text/html; charset=utf-8"[..],
                )
                .expect("build header");
                let response = tiny_http::Response::from_string(body)
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url_template(&self) -> String {
        format!("{}/catalogue/page-{{page}}.html", self.base_url)
    }
}

impl Drop for CatalogueStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
