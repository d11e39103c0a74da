//! JavaScript run inside the page or by the Node bridge. Page snippets are
//! function bodies; the bridge binds the caller's argument to `arg`.

pub const STEALTH_INIT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
Object.defineProperty(navigator, 'platform', { get: () => 'Win32' });
Object.defineProperty(navigator, 'hardwareConcurrency', { get: () => 8 });
window.chrome = window.chrome || { runtime: {} };
"#;

pub const VISIBLE_TEXT: &str = r#"
const body = document.body ? document.body.cloneNode(true) : null;
if (!body) return "";
body.querySelectorAll("script, style, noscript, iframe").forEach(el => el.remove());
return body.innerText || "";
"#;

pub const IMAGE_URLS: &str = r#"
return Array.from(document.querySelectorAll('img'))
  .map(img => img.src)
  .filter(src => src && src.startsWith('http') && !src.includes('base64'))
  .slice(0, 50);
"#;

pub const SCROLL_HEIGHT: &str = "return document.body ? document.body.scrollHeight : 0;";

pub const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body ? document.body.scrollHeight : 0); return null;";

pub const SCROLL_TO_TOP: &str = "window.scrollTo(0, 0); return null;";

pub const SCROLL_BY: &str = "window.scrollBy(0, arg); return null;";

pub const SCROLL_CONTAINER_TO_END: &str = r#"
const el = document.querySelector(arg);
if (el) el.scrollTop = el.scrollHeight;
return null;
"#;

/// `arg` = `{ selector, index, html }`.
pub const INJECT_AFTER_NTH: &str = r#"
const el = document.querySelectorAll(arg.selector)[arg.index];
if (!el) return false;
el.insertAdjacentHTML('beforeend', arg.html);
return true;
"#;

/// Node.js process hosting one Chromium page. Reads JSON commands, one per
/// line, from stdin and answers `{id, ok, result | error, timeout}` on stdout.
pub const BRIDGE: &str = r#"
const readline = require('readline');
const { chromium } = require('playwright');

let browser = null;
let context = null;
let page = null;

const reply = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');
const locate = (c) => {
  const loc = page.locator(c.selector);
  return (c.nth === null || c.nth === undefined) ? loc.first() : loc.nth(c.nth);
};
const lowerHeaders = (h) => Object.fromEntries(Object.entries(h || {}).map(([k, v]) => [k.toLowerCase(), v]));

const handlers = {
  async launch(c) {
    browser = await chromium.launch({
      headless: c.headless,
      args: ['--no-sandbox', '--disable-setuid-sandbox', '--disable-dev-shm-usage', '--disable-blink-features=AutomationControlled'],
    });
    const opts = { viewport: { width: c.viewport_width, height: c.viewport_height }, ignoreHTTPSErrors: true };
    if (c.user_agent) opts.userAgent = c.user_agent;
    if (c.storage_state) opts.storageState = c.storage_state;
    context = await browser.newContext(opts);
    if (c.init_script) await context.addInitScript(c.init_script);
    if (c.block_resources) {
      await context.route('**/*', (route) =>
        ['image', 'media', 'font'].includes(route.request().resourceType()) ? route.abort() : route.continue());
    }
    page = await context.newPage();
    return true;
  },
  async goto(c) {
    const resp = await page.goto(c.url, { waitUntil: c.wait_until, timeout: c.timeout });
    if (!resp) return null;
    return { status: resp.status(), url: resp.url(), headers: lowerHeaders(resp.headers()) };
  },
  async fetch(c) {
    const resp = await page.request.get(c.url, { timeout: c.timeout });
    const body = await resp.body();
    return { status: resp.status(), url: resp.url(), headers: lowerHeaders(resp.headers()), body: body.toString('base64') };
  },
  async screenshot(c) {
    const buf = await page.screenshot({ type: 'jpeg', quality: c.quality, fullPage: c.full_page });
    return buf.toString('base64');
  },
  async evaluate(c) {
    const fn = new Function('arg', c.script);
    const r = await page.evaluate(fn, c.arg);
    return r === undefined ? null : r;
  },
  async content() { return await page.content(); },
  async title() { return await page.title(); },
  async url() { return page.url(); },
  async accessibility() {
    if (page.accessibility && page.accessibility.snapshot) return await page.accessibility.snapshot();
    return await page.locator('body').ariaSnapshot();
  },
  async storage_state() { return await context.storageState(); },
  async wait_for_load_state(c) { await page.waitForLoadState(c.state, { timeout: c.timeout }); return null; },
  async wait_for_selector(c) { await page.waitForSelector(c.selector, { timeout: c.timeout }); return null; },
  async count(c) { return await page.locator(c.selector).count(); },
  async click(c) { await locate(c).click({ timeout: c.timeout }); return null; },
  async fill(c) { await locate(c).fill(c.text, { timeout: c.timeout }); return null; },
  async press(c) { await locate(c).press(c.key, { timeout: c.timeout }); return null; },
  async is_visible(c) { return await locate(c).isVisible(); },
  async attribute(c) { return await locate(c).getAttribute(c.name, { timeout: 2000 }); },
  async inner_text(c) { return await locate(c).innerText({ timeout: 2000 }); },
  async go_back(c) { await page.goBack({ timeout: c.timeout }); return null; },
  async open_new_tab(c) {
    const next = await context.newPage();
    await next.goto(c.url, { waitUntil: 'domcontentloaded', timeout: c.timeout });
    page = next;
    return null;
  },
  async close() {
    if (context) await context.close().catch(() => {});
    if (browser) await browser.close().catch(() => {});
    return null;
  },
};

const rl = readline.createInterface({ input: process.stdin });
let queue = Promise.resolve();
rl.on('line', (line) => {
  queue = queue.then(async () => {
    let msg;
    try { msg = JSON.parse(line); } catch (e) { return; }
    const handler = handlers[msg.cmd];
    try {
      if (!handler) throw new Error('unknown command: ' + msg.cmd);
      const result = await handler(msg);
      reply({ id: msg.id, ok: true, result: result === undefined ? null : result });
    } catch (e) {
      reply({ id: msg.id, ok: false, error: String((e && e.message) || e), timeout: !!(e && e.name === 'TimeoutError') });
    }
    if (msg.cmd === 'close') process.exit(0);
  });
});
rl.on('close', () => {
  queue.then(async () => {
    if (browser) await browser.close().catch(() => {});
    process.exit(0);
  });
});
"#;
